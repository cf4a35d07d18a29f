mod common;

use common::{check_tree, ids, open, row, scratch_db};
use leafdb::error::DbError;
use leafdb::storage::row::Row;

#[test]
fn empty_table_selects_nothing() {
    let (_dir, path) = scratch_db("empty.db");
    let mut table = open(&path);

    assert!(table.scan().unwrap().is_empty());
    assert!(table.tree().table_start().unwrap().end_of_table());
    assert_eq!(table.find(1).unwrap(), None);
    assert_eq!(table.num_pages(), 1);
}

#[test]
fn rows_come_back_in_id_order() {
    let (_dir, path) = scratch_db("order.db");
    let mut table = open(&path);

    for id in [3, 1, 2] {
        table.insert(&row(id)).unwrap();
    }

    let rows = table.scan().unwrap();
    assert_eq!(ids(&rows), vec![1, 2, 3]);
    assert_eq!(rows[0], Row::new(1, "user1", "person1@example.com"));
    assert_eq!(rows[0].to_string(), "(1, user1, person1@example.com)");
}

#[test]
fn duplicate_id_is_rejected_without_change() {
    let (_dir, path) = scratch_db("duplicate.db");
    let mut table = open(&path);

    table.insert(&row(1)).unwrap();
    let err = table.insert(&Row::new(1, "other", "other@example.com")).unwrap_err();
    assert!(matches!(err, DbError::DuplicateKey(1)));

    let rows = table.scan().unwrap();
    assert_eq!(rows, vec![row(1)]);
}

#[test]
fn overlong_strings_are_rejected() {
    let (_dir, path) = scratch_db("too_long.db");
    let mut table = open(&path);

    let long_name = "a".repeat(33);
    let err = table.insert(&Row::new(1, long_name, "a@b.c")).unwrap_err();
    assert!(matches!(err, DbError::StringTooLong { column: "username", max: 32 }));

    let long_email = "a".repeat(256);
    let err = table.insert(&Row::new(1, "name", long_email)).unwrap_err();
    assert!(matches!(err, DbError::StringTooLong { column: "email", max: 255 }));

    assert!(table.scan().unwrap().is_empty());
}

#[test]
fn embedded_nul_is_rejected() {
    let (_dir, path) = scratch_db("nul.db");
    let mut table = open(&path);

    let err = table.insert(&Row::new(1, "bad\0name", "a@b.c")).unwrap_err();
    assert!(matches!(err, DbError::NulInString { column: "username" }));
    let err = table.insert(&Row::new(1, "name", "a\0@b.c")).unwrap_err();
    assert!(matches!(err, DbError::NulInString { column: "email" }));

    assert!(table.scan().unwrap().is_empty());
}

#[test]
fn maximum_length_strings_round_trip() {
    let (_dir, path) = scratch_db("max_len.db");
    let mut table = open(&path);

    let full = Row::new(1, "a".repeat(32), "a".repeat(255));
    table.insert(&full).unwrap();
    table.close().unwrap();

    let mut table = open(&path);
    assert_eq!(table.scan().unwrap(), vec![full]);
}

#[test]
fn extreme_ids_are_ordinary_keys() {
    let (_dir, path) = scratch_db("extremes.db");
    let mut table = open(&path);

    for id in [u32::MAX, 0, 7, u32::MAX - 1] {
        table.insert(&row(id)).unwrap();
    }
    assert_eq!(ids(&table.scan().unwrap()), vec![0, 7, u32::MAX - 1, u32::MAX]);
    assert_eq!(table.find(u32::MAX).unwrap(), Some(row(u32::MAX)));
}

#[test]
fn find_positions_cursor_at_key_or_insertion_point() {
    let (_dir, path) = scratch_db("find.db");
    let mut table = open(&path);
    for id in [10, 20, 30] {
        table.insert(&row(id)).unwrap();
    }

    let mut tree = table.tree();
    let hit = tree.find(20).unwrap();
    assert_eq!((hit.page_num(), hit.cell_num(), hit.end_of_table()), (0, 1, false));
    assert_eq!(tree.cursor_key(&hit).unwrap(), Some(20));
    assert_eq!(tree.cursor_row(&hit).unwrap(), row(20));

    let gap = tree.find(25).unwrap();
    assert_eq!(gap.cell_num(), 2);
    assert_eq!(tree.cursor_key(&gap).unwrap(), Some(30));

    let past = tree.find(31).unwrap();
    assert_eq!(past.cell_num(), 3);
    assert!(past.end_of_table());
    assert_eq!(tree.cursor_key(&past).unwrap(), None);

    assert_eq!(tree.get(25).unwrap(), None);
    assert_eq!(tree.get(30).unwrap(), Some(row(30)));
}

#[test]
fn cursor_walks_a_single_leaf() {
    let (_dir, path) = scratch_db("cursor.db");
    let mut table = open(&path);
    for id in [5, 3, 9] {
        table.insert(&row(id)).unwrap();
    }

    let mut tree = table.tree();
    let mut cursor = tree.table_start().unwrap();
    let mut seen = Vec::new();
    while !cursor.end_of_table() {
        seen.push(tree.cursor_row(&cursor).unwrap().id);
        tree.advance(&mut cursor).unwrap();
    }
    assert_eq!(seen, vec![3, 5, 9]);
    assert_eq!(cursor.cell_num(), 3);
}

#[test]
fn thirteen_rows_fit_in_the_root_leaf() {
    let (_dir, path) = scratch_db("one_leaf.db");
    let mut table = open(&path);
    for id in 1..=13 {
        table.insert(&row(id)).unwrap();
    }

    let stats = check_tree(&mut table);
    assert_eq!((stats.height, stats.leaves, stats.rows), (1, 1, 13));
    assert_eq!(table.num_pages(), 1);
}
