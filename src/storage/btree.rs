use log::debug;

use crate::error::{DbError, DbResult};
use crate::storage::cursor::Cursor;
use crate::storage::layout::Layout;
use crate::storage::node::{InternalNode, LeafNode, Node};
use crate::storage::page::{set_is_root, set_parent};
use crate::storage::pager::Pager;
use crate::storage::row::Row;

/// A B-Tree keyed on `u32` row ids that can grow to arbitrary height by
/// splitting leaves and internal nodes.
///
/// Leaves hold `(key, row)` cells in ascending key order. Internal nodes hold
/// `(child, key)` cells plus a right child: child `i` holds every key `<= key_i`
/// and `key_i` is exactly that subtree's largest key; the right child holds
/// everything greater than the last key.
///
///—————————————————————————————————————————————————————————————————————————————————————————————
/// On insert:
///   1. Descend from root to the leaf that would hold the key; reject duplicates.
///   2. Reserve the worst-case number of new pages so a full table fails before any write.
///   3. Insert into the leaf. If it is full, split it:
///        • Allocate a new leaf,
///        • Keep the lower ceil((MAX + 1) / 2) cells in place, move the rest,
///        • Report (left max key, new page) to the caller.
///   4. A parent receiving that report inserts the new separator. If it overflows
///      it splits too, pushing its middle key up, and so on.
///   5. If the root splits, its contents move to a fresh page and the root page
///      becomes an internal node with one key and two children.
///—————————————————————————————————————————————————————————————————————————————————————————————
pub struct BTree<'a> {
    pub(crate) root_page: u32,
    pub(crate) pager: &'a mut Pager,
    pub(crate) layout: Layout,
}

/// What happened below a node during insert.
enum InsertOutcome {
    Absorbed,
    Split { left_max: u32, right_page: u32 },
}

enum InsertStep {
    SplitLeaf(usize),
    Descend { index: usize, child: u32 },
}

/// Snapshot of a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeInfo {
    Leaf {
        page_num: u32,
        is_root: bool,
        parent: u32,
        keys: Vec<u32>,
    },
    Internal {
        page_num: u32,
        is_root: bool,
        parent: u32,
        keys: Vec<u32>,
        /// Cell children in order, right child last.
        children: Vec<u32>,
    },
}

impl NodeInfo {
    pub fn keys(&self) -> &[u32] {
        match self {
            NodeInfo::Leaf { keys, .. } | NodeInfo::Internal { keys, .. } => keys,
        }
    }

    pub fn is_root(&self) -> bool {
        match self {
            NodeInfo::Leaf { is_root, .. } | NodeInfo::Internal { is_root, .. } => *is_root,
        }
    }

    pub fn parent(&self) -> u32 {
        match self {
            NodeInfo::Leaf { parent, .. } | NodeInfo::Internal { parent, .. } => *parent,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeInfo::Leaf { .. })
    }
}

impl<'a> BTree<'a> {
    pub fn open_root(pager: &'a mut Pager, root_page: u32) -> BTree<'a> {
        let layout = *pager.layout();
        BTree { root_page, pager, layout }
    }

    pub fn root_page(&self) -> u32 {
        self.root_page
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Position a cursor at the cell holding `key`, or where it would be inserted.
    pub fn find(&mut self, key: u32) -> DbResult<Cursor> {
        let layout = self.layout;
        let mut page_num = self.root_page;
        let mut depth = 0;

        loop {
            self.check_depth(depth, page_num)?;
            let page = self.pager.get_page(page_num)?;
            match Node::new(&page.data[..], layout)? {
                Node::Leaf(leaf) => {
                    let cell_num = leaf.search(key);
                    return Ok(Cursor::new(page_num, cell_num, cell_num >= leaf.cell_count()));
                }
                Node::Internal(node) => {
                    let index = node.search(key);
                    let child = node.child_or_right(index);
                    debug!("find: key {} descends from page {} to child {}", key, page_num, child);
                    page_num = child;
                }
            }
            depth += 1;
        }
    }

    /// Bounds every descent. A root-to-leaf path visits each page at most
    /// once, so anything deeper than the page count means the child pointers
    /// loop; a pointer past the last page is dangling.
    pub(crate) fn check_depth(&self, depth: u32, page_num: u32) -> DbResult<()> {
        if page_num >= self.pager.num_pages() {
            return Err(DbError::Corruption(format!(
                "child pointer to page {} past the end of a {}-page file",
                page_num,
                self.pager.num_pages()
            )));
        }
        if depth > self.pager.num_pages() {
            return Err(DbError::Corruption(format!(
                "page {} reached at depth {} in a {}-page file",
                page_num,
                depth,
                self.pager.num_pages()
            )));
        }
        Ok(())
    }

    /// Point lookup.
    pub fn get(&mut self, key: u32) -> DbResult<Option<Row>> {
        let cursor = self.find(key)?;
        if self.cursor_key(&cursor)? != Some(key) {
            return Ok(None);
        }
        self.cursor_row(&cursor).map(Some)
    }

    /// Largest key stored under `page_num`. The subtree must not be an empty leaf.
    pub fn node_max_key(&mut self, page_num: u32) -> DbResult<u32> {
        self.max_key_below(page_num, 0)
    }

    fn max_key_below(&mut self, page_num: u32, depth: u32) -> DbResult<u32> {
        self.check_depth(depth, page_num)?;
        let layout = self.layout;
        let right_child = {
            let page = self.pager.get_page(page_num)?;
            match Node::new(&page.data[..], layout)? {
                Node::Leaf(leaf) => return Ok(leaf.max_key()),
                Node::Internal(node) => node.right_child(),
            }
        };
        self.max_key_below(right_child, depth + 1)
    }

    /// Insert `row` keyed by its id.
    pub fn insert(&mut self, row: &Row) -> DbResult<()> {
        let key = row.id;
        debug!("insert() → key={} starting at root {}", key, self.root_page);

        let cursor = self.find(key)?;
        if self.cursor_key(&cursor)? == Some(key) {
            return Err(DbError::DuplicateKey(key));
        }

        let mut value = vec![0u8; self.layout.row_size()];
        row.serialize(&mut value, &self.layout)?;

        let needed = self.pages_needed(key)?;
        self.pager.reserve(needed)?;

        if let InsertOutcome::Split { left_max, right_page } =
            self.insert_into(self.root_page, key, &value, 0)?
        {
            self.create_new_root(left_max, right_page)?;
        }
        debug!("insert() complete for key={}", key);
        Ok(())
    }

    /// Worst-case page allocations for inserting `key`: one per full node on the
    /// path counted from the leaf up, plus one more when the root itself splits.
    fn pages_needed(&mut self, key: u32) -> DbResult<u32> {
        let layout = self.layout;
        let mut full_path = Vec::new();
        let mut page_num = self.root_page;
        for depth in 0.. {
            self.check_depth(depth, page_num)?;
            let page = self.pager.get_page(page_num)?;
            match Node::new(&page.data[..], layout)? {
                Node::Leaf(leaf) => {
                    full_path.push(leaf.is_full());
                    break;
                }
                Node::Internal(node) => {
                    full_path.push(node.is_full());
                    page_num = node.child_or_right(node.search(key));
                }
            }
        }

        let splits = full_path.iter().rev().take_while(|&&full| full).count();
        let relocation = if splits == full_path.len() { 1 } else { 0 };
        Ok((splits + relocation) as u32)
    }

    /// Recursive helper to insert below `page_num`.
    fn insert_into(
        &mut self,
        page_num: u32,
        key: u32,
        value: &[u8],
        depth: u32,
    ) -> DbResult<InsertOutcome> {
        self.check_depth(depth, page_num)?;
        let layout = self.layout;
        let step = {
            let page = self.pager.get_page(page_num)?;
            match Node::new(&mut page.data[..], layout)? {
                Node::Leaf(mut leaf) => {
                    let index = leaf.search(key);
                    if !leaf.is_full() {
                        leaf.insert_cell(index, key, value);
                        debug!("  → Wrote key {} at cell {} of leaf {}", key, index, page_num);
                        return Ok(InsertOutcome::Absorbed);
                    }
                    InsertStep::SplitLeaf(index)
                }
                Node::Internal(node) => {
                    let index = node.search(key);
                    InsertStep::Descend { index, child: node.child_or_right(index) }
                }
            }
        };

        match step {
            InsertStep::SplitLeaf(index) => self.split_leaf(page_num, index, key, value),
            InsertStep::Descend { index, child } => match self.insert_into(child, key, value, depth + 1)? {
                InsertOutcome::Absorbed => Ok(InsertOutcome::Absorbed),
                InsertOutcome::Split { left_max, right_page } => {
                    self.insert_separator(page_num, index, left_max, right_page)
                }
            },
        }
    }

    /// Split the full leaf `page_num` while inserting `(key, value)` at `index`.
    fn split_leaf(
        &mut self,
        page_num: u32,
        index: usize,
        key: u32,
        value: &[u8],
    ) -> DbResult<InsertOutcome> {
        let layout = self.layout;
        let (mut cells, parent) = {
            let page = self.pager.get_page(page_num)?;
            let leaf = LeafNode::new(&page.data[..], layout)?;
            let cells: Vec<(u32, Vec<u8>)> = (0..leaf.cell_count())
                .map(|cell| (leaf.key(cell), leaf.value(cell).to_vec()))
                .collect();
            (cells, leaf.parent())
        };
        cells.insert(index, (key, value.to_vec()));
        assert_eq!(
            cells.len(),
            layout.leaf_max_cells() + 1,
            "split_leaf called on a leaf that is not full"
        );

        let left_count = layout.leaf_left_split_count();
        let (left, right) = cells.split_at(left_count);

        let new_page = self.pager.allocate_page()?;
        debug!(
            "split_leaf: leaf {} keeps {} cells, new leaf {} takes {}",
            page_num,
            left.len(),
            new_page,
            right.len()
        );

        self.write_leaf(page_num, left)?;
        {
            let page = self.pager.get_page(new_page)?;
            let mut leaf = LeafNode::initialize(&mut page.data[..], layout);
            leaf.set_parent(parent);
            leaf.write_all(right);
        }

        Ok(InsertOutcome::Split { left_max: left[left_count - 1].0, right_page: new_page })
    }

    fn write_leaf(&mut self, page_num: u32, cells: &[(u32, Vec<u8>)]) -> DbResult<()> {
        let layout = self.layout;
        let page = self.pager.get_page(page_num)?;
        LeafNode::new(&mut page.data[..], layout)?.write_all(cells);
        Ok(())
    }

    /// The child at slot `index` of internal node `page_num` has split into
    /// itself (now topped by `left_max`) and `right_page`.
    fn insert_separator(
        &mut self,
        page_num: u32,
        index: usize,
        left_max: u32,
        right_page: u32,
    ) -> DbResult<InsertOutcome> {
        let (mut keys, mut children) = self.read_internal(page_num)?;
        keys.insert(index, left_max);
        children.insert(index + 1, right_page);

        if keys.len() <= self.layout.internal_max_cells() {
            self.write_internal(page_num, &keys, &children)?;
            self.reparent(right_page, page_num)?;
            debug!("  → Inserted separator {} into internal {}", left_max, page_num);
            return Ok(InsertOutcome::Absorbed);
        }

        debug!("  → Internal overflow at page {}! Splitting internal node.", page_num);
        self.split_internal(page_num, keys, children, right_page)
    }

    /// Split an internal node at `page_num`. `keys` and `children` are the full
    /// lists after insertion; `new_child` is the page that was just added.
    ///
    ///   left  = keys[..mid],   children[..=mid]
    ///   right = keys[mid+1..], children[mid+1..]
    ///   keys[mid] is pushed up to the parent.
    fn split_internal(
        &mut self,
        page_num: u32,
        keys: Vec<u32>,
        children: Vec<u32>,
        new_child: u32,
    ) -> DbResult<InsertOutcome> {
        let layout = self.layout;
        let mid = keys.len() / 2;
        let separator = keys[mid];

        let parent = {
            let page = self.pager.get_page(page_num)?;
            InternalNode::new(&page.data[..], layout)?.parent()
        };
        let new_page = self.pager.allocate_page()?;
        {
            let page = self.pager.get_page(new_page)?;
            let mut node = InternalNode::initialize(&mut page.data[..], layout);
            node.set_parent(parent);
            node.write_all(&keys[mid + 1..], &children[mid + 1..]);
        }
        self.write_internal(page_num, &keys[..mid], &children[..=mid])?;

        self.reparent(new_child, page_num)?;
        for &child in &children[mid + 1..] {
            self.reparent(child, new_page)?;
        }

        debug!(
            "split_internal: page {} keeps {} keys, new internal {} takes {}, separator {}",
            page_num,
            mid,
            new_page,
            keys.len() - mid - 1,
            separator
        );
        Ok(InsertOutcome::Split { left_max: separator, right_page: new_page })
    }

    /// The root split: move its (left half) contents to a fresh page and turn
    /// the root page into an internal node over that page and `right_page`.
    fn create_new_root(&mut self, left_max: u32, right_page: u32) -> DbResult<()> {
        let layout = self.layout;
        let root = self.root_page;
        let left_page = self.pager.allocate_page()?;

        let snapshot = self.pager.get_page(root)?.data.to_vec();
        let grandchildren = {
            let page = self.pager.get_page(left_page)?;
            page.data.copy_from_slice(&snapshot);
            set_is_root(&mut page.data[..], false);
            set_parent(&mut page.data[..], root);
            match Node::new(&page.data[..], layout)? {
                Node::Internal(node) => node.children(),
                Node::Leaf(_) => Vec::new(),
            }
        };
        for child in grandchildren {
            self.reparent(child, left_page)?;
        }

        {
            let page = self.pager.get_page(root)?;
            let mut node = InternalNode::initialize(&mut page.data[..], layout);
            node.set_root(true);
            node.write_all(&[left_max], &[left_page, right_page]);
        }
        self.reparent(right_page, root)?;

        debug!(
            "  → Root {} split: left half moved to page {}, right half in page {}, separator {}",
            root, left_page, right_page, left_max
        );
        Ok(())
    }

    /// Read all keys and children (right child last) from an internal node.
    fn read_internal(&mut self, page_num: u32) -> DbResult<(Vec<u32>, Vec<u32>)> {
        let layout = self.layout;
        let page = self.pager.get_page(page_num)?;
        let node = InternalNode::new(&page.data[..], layout)?;
        Ok((node.keys(), node.children()))
    }

    fn write_internal(&mut self, page_num: u32, keys: &[u32], children: &[u32]) -> DbResult<()> {
        let layout = self.layout;
        let page = self.pager.get_page(page_num)?;
        InternalNode::new(&mut page.data[..], layout)?.write_all(keys, children);
        Ok(())
    }

    fn reparent(&mut self, page_num: u32, parent: u32) -> DbResult<()> {
        let page = self.pager.get_page(page_num)?;
        set_parent(&mut page.data[..], parent);
        Ok(())
    }

    /// Every row in ascending key order: an in-order walk over the tree that
    /// reads each leaf with a cursor.
    pub fn scan(&mut self) -> DbResult<Vec<Row>> {
        let mut rows = Vec::new();
        self.collect_rows(self.root_page, 0, &mut rows)?;
        Ok(rows)
    }

    fn collect_rows(&mut self, page_num: u32, depth: u32, rows: &mut Vec<Row>) -> DbResult<()> {
        self.check_depth(depth, page_num)?;
        let layout = self.layout;
        let children = {
            let page = self.pager.get_page(page_num)?;
            match Node::new(&page.data[..], layout)? {
                Node::Leaf(_) => None,
                Node::Internal(node) => Some(node.children()),
            }
        };

        match children {
            Some(children) => {
                for child in children {
                    self.collect_rows(child, depth + 1, rows)?;
                }
            }
            None => {
                let mut cursor = self.leaf_start(page_num)?;
                while !cursor.end_of_table() {
                    rows.push(self.cursor_row(&cursor)?);
                    self.advance(&mut cursor)?;
                }
            }
        }
        Ok(())
    }

    pub fn inspect(&mut self, page_num: u32) -> DbResult<NodeInfo> {
        let layout = self.layout;
        let page = self.pager.get_page(page_num)?;
        Ok(match Node::new(&page.data[..], layout)? {
            Node::Leaf(leaf) => NodeInfo::Leaf {
                page_num,
                is_root: leaf.is_root(),
                parent: leaf.parent(),
                keys: leaf.keys(),
            },
            Node::Internal(node) => NodeInfo::Internal {
                page_num,
                is_root: node.is_root(),
                parent: node.parent(),
                keys: node.keys(),
                children: node.children(),
            },
        })
    }

    /// Indented dump of the whole tree, one line per node, key and separator.
    pub fn render(&mut self) -> DbResult<String> {
        let mut out = String::new();
        self.render_node(self.root_page, 0, &mut out)?;
        Ok(out)
    }

    fn render_node(&mut self, page_num: u32, depth: u32, out: &mut String) -> DbResult<()> {
        self.check_depth(depth, page_num)?;
        let indent = "  ".repeat(depth as usize);
        match self.inspect(page_num)? {
            NodeInfo::Leaf { keys, .. } => {
                out.push_str(&format!("{}- leaf (size {})\n", indent, keys.len()));
                for key in keys {
                    out.push_str(&format!("{}  - {}\n", indent, key));
                }
            }
            NodeInfo::Internal { keys, children, .. } => {
                out.push_str(&format!("{}- internal (size {})\n", indent, keys.len()));
                for (key, &child) in keys.iter().zip(&children) {
                    self.render_node(child, depth + 1, out)?;
                    out.push_str(&format!("{}  - key {}\n", indent, key));
                }
                if let Some(&right) = children.last() {
                    self.render_node(right, depth + 1, out)?;
                }
            }
        }
        Ok(())
    }
}

