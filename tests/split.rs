mod common;

use common::{check_tree, ids, narrow_config, open, row, scratch_db, scrambled};
use leafdb::storage::btree::NodeInfo;
use leafdb::table::Table;

#[test]
fn fourteenth_row_splits_the_root_leaf() {
    let (_dir, path) = scratch_db("split.db");
    let mut table = open(&path);
    for id in 1..=14 {
        table.insert(&row(id)).unwrap();
    }

    let mut tree = table.tree();
    let root = tree.inspect(0).unwrap();
    let NodeInfo::Internal { keys, children, is_root, .. } = root else {
        panic!("root should be internal after the split");
    };
    assert!(is_root);
    assert_eq!(keys, vec![7]);
    assert_eq!(children.len(), 2);

    let left = tree.inspect(children[0]).unwrap();
    let right = tree.inspect(children[1]).unwrap();
    assert!(left.is_leaf() && right.is_leaf());
    assert_eq!(left.keys(), &[1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(right.keys(), &[8, 9, 10, 11, 12, 13, 14]);
    assert_eq!(tree.node_max_key(children[0]).unwrap(), 7);
    assert_eq!(tree.node_max_key(0).unwrap(), 14);

    assert_eq!(ids(&table.scan().unwrap()), (1..=14).collect::<Vec<_>>());
    let stats = check_tree(&mut table);
    assert_eq!((stats.height, stats.leaves), (2, 2));
    assert_eq!(table.num_pages(), 3);
}

#[test]
fn smaller_key_after_full_leaf_scans_first() {
    let (_dir, path) = scratch_db("smaller.db");
    let mut table = open(&path);
    for id in 10..=22 {
        table.insert(&row(id)).unwrap();
    }
    table.insert(&row(1)).unwrap();

    let rows = table.scan().unwrap();
    assert_eq!(rows.len(), 14);
    assert_eq!(rows[0].id, 1);
    check_tree(&mut table);
}

#[test]
fn render_shows_separators_between_leaves() {
    let (_dir, path) = scratch_db("render.db");
    let mut table = open(&path);
    for id in 1..=14 {
        table.insert(&row(id)).unwrap();
    }

    let mut expected = String::from("- internal (size 1)\n  - leaf (size 7)\n");
    for key in 1..=7 {
        expected.push_str(&format!("    - {}\n", key));
    }
    expected.push_str("  - key 7\n  - leaf (size 7)\n");
    for key in 8..=14 {
        expected.push_str(&format!("    - {}\n", key));
    }
    assert_eq!(table.tree().render().unwrap(), expected);
}

#[test]
fn render_single_leaf() {
    let (_dir, path) = scratch_db("render_leaf.db");
    let mut table = open(&path);
    for id in [3, 1, 2] {
        table.insert(&row(id)).unwrap();
    }
    assert_eq!(
        table.tree().render().unwrap(),
        "- leaf (size 3)\n  - 1\n  - 2\n  - 3\n"
    );
}

#[test]
fn cursor_stops_at_the_end_of_its_leaf() {
    let (_dir, path) = scratch_db("leaf_cursor.db");
    let mut table = open(&path);
    for id in 1..=14 {
        table.insert(&row(id)).unwrap();
    }

    let mut tree = table.tree();
    let mut cursor = tree.table_start().unwrap();
    let mut seen = Vec::new();
    while !cursor.end_of_table() {
        seen.push(tree.cursor_key(&cursor).unwrap().unwrap());
        tree.advance(&mut cursor).unwrap();
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn internal_root_split_grows_a_new_level() {
    let (_dir, path) = scratch_db("internal_split.db");
    let mut table = Table::open_with(&path, narrow_config(3)).unwrap();

    // Each leaf split after the first adds one separator; the fifth leaf
    // overflows a 3-key root.
    let mut id = 0;
    loop {
        id += 1;
        table.insert(&row(id)).unwrap();
        let root = table.tree().inspect(0).unwrap();
        if !root.is_leaf() && root.keys().len() == 3 {
            break;
        }
    }
    assert_eq!(id, 28);
    let stats = check_tree(&mut table);
    assert_eq!(stats.height, 2);

    loop {
        id += 1;
        table.insert(&row(id)).unwrap();
        if check_tree(&mut table).height == 3 {
            break;
        }
        assert!(id < 200, "root never split");
    }

    let mut tree = table.tree();
    let NodeInfo::Internal { keys, children, .. } = tree.inspect(0).unwrap() else {
        panic!("root should be internal");
    };
    assert_eq!(keys.len(), 1);
    for child in children {
        let info = tree.inspect(child).unwrap();
        assert!(!info.is_leaf());
        assert_eq!(info.parent(), 0);
    }
    assert_eq!(ids(&table.scan().unwrap()), (1..=id).collect::<Vec<_>>());
}

#[test]
fn scrambled_inserts_build_a_deep_valid_tree() {
    let (_dir, path) = scratch_db("deep.db");
    let mut table = Table::open_with(&path, narrow_config(3)).unwrap();

    let order = scrambled(500);
    for (n, &id) in order.iter().enumerate() {
        table.insert(&row(id)).unwrap();
        if n % 50 == 0 {
            check_tree(&mut table);
        }
    }

    let stats = check_tree(&mut table);
    assert!(stats.height >= 4, "height was {}", stats.height);
    assert_eq!(stats.rows, 500);
    assert_eq!(ids(&table.scan().unwrap()), (1..=500).collect::<Vec<_>>());

    for id in [1, 137, 250, 499, 500] {
        assert_eq!(table.find(id).unwrap(), Some(row(id)));
    }
    assert_eq!(table.find(501).unwrap(), None);
}

#[test]
fn descending_inserts_with_default_fan_out() {
    let (_dir, path) = scratch_db("descending.db");
    let mut table = open(&path);

    for id in (1..=2000).rev() {
        table.insert(&row(id)).unwrap();
    }

    let stats = check_tree(&mut table);
    assert_eq!(stats.rows, 2000);
    assert_eq!(stats.height, 2);
    assert_eq!(ids(&table.scan().unwrap()), (1..=2000).collect::<Vec<_>>());
}

#[test]
fn wide_leaves_split_evenly_with_a_small_page() {
    use leafdb::storage::layout::TableConfig;

    let (_dir, path) = scratch_db("small_page.db");
    let config = TableConfig { page_size: 1024, ..TableConfig::default() };
    let mut table = Table::open_with(&path, config).unwrap();
    let max = table.layout().leaf_max_cells();
    assert_eq!(max, 3);

    for id in 1..=4 {
        table.insert(&row(id)).unwrap();
    }
    let mut tree = table.tree();
    let NodeInfo::Internal { keys, children, .. } = tree.inspect(0).unwrap() else {
        panic!("root should be internal");
    };
    assert_eq!(keys, vec![2]);
    assert_eq!(tree.inspect(children[0]).unwrap().keys(), &[1, 2]);
    assert_eq!(tree.inspect(children[1]).unwrap().keys(), &[3, 4]);

    for id in 5..=300 {
        table.insert(&row(id)).unwrap();
    }
    let stats = check_tree(&mut table);
    assert_eq!(stats.rows, 300);
}
