#![allow(dead_code)]

use leafdb::storage::btree::{BTree, NodeInfo};
use leafdb::storage::layout::{Layout, TableConfig};
use leafdb::storage::row::Row;
use leafdb::table::Table;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn row(id: u32) -> Row {
    Row::new(id, format!("user{}", id), format!("person{}@example.com", id))
}

pub fn ids(rows: &[Row]) -> Vec<u32> {
    rows.iter().map(|r| r.id).collect()
}

/// A scratch directory plus the path of a database file inside it.
pub fn scratch_db(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    (dir, path)
}

pub fn open(path: &Path) -> Table {
    Table::open(path).unwrap()
}

/// Tables whose internal nodes hold at most `fan_out` keys, so a few hundred
/// rows are enough for a tree of height four or more.
pub fn narrow_config(fan_out: usize) -> TableConfig {
    TableConfig { internal_max_cells: Some(fan_out), ..TableConfig::default() }
}

/// The numbers `1..=n` in a scrambled but deterministic order.
pub fn scrambled(n: u32) -> Vec<u32> {
    assert_ne!(n % 7919, 0);
    (0..n).map(|i| (i as u64 * 7919 % n as u64) as u32 + 1).collect()
}

#[derive(Debug, Default)]
pub struct TreeStats {
    pub height: usize,
    pub rows: usize,
    pub leaves: usize,
}

/// Walk the whole tree and assert every structural invariant: ascending keys,
/// separators equal to their child's max key, key ranges respected, parent
/// pointers and root flags consistent, node capacities respected, and all
/// leaves at the same depth.
pub fn check_tree(table: &mut Table) -> TreeStats {
    let layout = *table.layout();
    let root = table.root_page();
    let mut tree = table.tree();

    let info = tree.inspect(root).unwrap();
    assert!(info.is_root(), "root page {} lost its root flag", root);

    let mut stats = TreeStats::default();
    let (height, _) = check_node(&mut tree, &layout, root, None, None, &mut stats);
    stats.height = height;
    stats
}

fn check_node(
    tree: &mut BTree<'_>,
    layout: &Layout,
    page_num: u32,
    lower: Option<u32>,
    upper: Option<u32>,
    stats: &mut TreeStats,
) -> (usize, Option<u32>) {
    let info = tree.inspect(page_num).unwrap();
    let keys = info.keys().to_vec();

    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1], "page {} keys out of order: {:?}", page_num, keys);
    }
    for &key in &keys {
        if let Some(low) = lower {
            assert!(key > low, "page {} key {} not above {}", page_num, key, low);
        }
        if let Some(high) = upper {
            assert!(key <= high, "page {} key {} above {}", page_num, key, high);
        }
    }

    match info {
        NodeInfo::Leaf { .. } => {
            assert!(keys.len() <= layout.leaf_max_cells());
            stats.rows += keys.len();
            stats.leaves += 1;
            (1, keys.last().copied())
        }
        NodeInfo::Internal { children, .. } => {
            assert!(!keys.is_empty(), "internal page {} has no keys", page_num);
            assert!(keys.len() <= layout.internal_max_cells());
            assert_eq!(children.len(), keys.len() + 1);

            let mut heights = Vec::new();
            let mut low = lower;
            let mut last_max = None;
            for (i, &child) in children.iter().enumerate() {
                let child_info = tree.inspect(child).unwrap();
                assert!(!child_info.is_root(), "child page {} is flagged as root", child);
                assert_eq!(child_info.parent(), page_num, "child page {} has a stale parent", child);

                let high = if i < keys.len() { Some(keys[i]) } else { upper };
                let (height, max) = check_node(tree, layout, child, low, high, stats);
                if i < keys.len() {
                    assert_eq!(max, Some(keys[i]), "separator {} is not the max of page {}", keys[i], child);
                    assert_eq!(tree.node_max_key(child).unwrap(), keys[i]);
                    low = Some(keys[i]);
                }
                heights.push(height);
                last_max = max;
            }
            assert!(heights.windows(2).all(|h| h[0] == h[1]), "uneven leaf depth under page {}", page_num);
            (heights[0] + 1, last_max)
        }
    }
}
