use crate::error::DbResult;
use crate::storage::btree::BTree;
use crate::storage::node::{LeafNode, Node};
use crate::storage::row::Row;

/// A position inside one leaf: `(page_num, cell_num)`.
///
/// Cursors do not follow sibling links (leaves have none), so `end_of_table`
/// means "past the last cell of this leaf". Any insert that touches the leaf
/// invalidates the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    page_num: u32,
    cell_num: usize,
    end_of_table: bool,
}

impl Cursor {
    pub(crate) fn new(page_num: u32, cell_num: usize, end_of_table: bool) -> Self {
        Cursor { page_num, cell_num, end_of_table }
    }

    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    pub fn cell_num(&self) -> usize {
        self.cell_num
    }

    pub fn end_of_table(&self) -> bool {
        self.end_of_table
    }
}

impl BTree<'_> {
    /// Cursor at the first cell of the leftmost leaf.
    pub fn table_start(&mut self) -> DbResult<Cursor> {
        let layout = self.layout;
        let mut page_num = self.root_page;
        for depth in 0.. {
            self.check_depth(depth, page_num)?;
            let page = self.pager.get_page(page_num)?;
            match Node::new(&page.data[..], layout)? {
                Node::Leaf(_) => break,
                Node::Internal(node) => page_num = node.child_or_right(0),
            }
        }
        self.leaf_start(page_num)
    }

    /// Cursor at the first cell of leaf `page_num`.
    pub fn leaf_start(&mut self, page_num: u32) -> DbResult<Cursor> {
        let layout = self.layout;
        let page = self.pager.get_page(page_num)?;
        let leaf = LeafNode::new(&page.data[..], layout)?;
        Ok(Cursor::new(page_num, 0, leaf.cell_count() == 0))
    }

    pub fn advance(&mut self, cursor: &mut Cursor) -> DbResult<()> {
        let layout = self.layout;
        let page = self.pager.get_page(cursor.page_num)?;
        let leaf = LeafNode::new(&page.data[..], layout)?;
        cursor.cell_num += 1;
        if cursor.cell_num >= leaf.cell_count() {
            cursor.end_of_table = true;
        }
        Ok(())
    }

    /// Key under the cursor, or `None` when it sits past the leaf's last cell.
    pub fn cursor_key(&mut self, cursor: &Cursor) -> DbResult<Option<u32>> {
        let layout = self.layout;
        let page = self.pager.get_page(cursor.page_num)?;
        let leaf = LeafNode::new(&page.data[..], layout)?;
        if cursor.cell_num < leaf.cell_count() {
            Ok(Some(leaf.key(cursor.cell_num)))
        } else {
            Ok(None)
        }
    }

    pub fn cursor_row(&mut self, cursor: &Cursor) -> DbResult<Row> {
        let layout = self.layout;
        let page = self.pager.get_page(cursor.page_num)?;
        let leaf = LeafNode::new(&page.data[..], layout)?;
        Row::deserialize(leaf.value(cursor.cell_num), &layout)
    }
}
