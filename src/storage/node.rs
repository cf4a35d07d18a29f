//! Typed views over a page buffer.
//!
//! `LeafNode` and `InternalNode` wrap any byte buffer (`&[u8]`, `&mut [u8]`,
//! `Vec<u8>`) together with the table's `Layout`. They never copy the page;
//! every accessor indexes straight into the buffer and panics when asked for a
//! cell at or beyond the node's own count.

use crate::error::{DbError, DbResult};
use crate::storage::layout::Layout;
use crate::storage::page::{
    get_is_root, get_node_type, get_parent, read_u32, set_is_root, set_node_type, set_parent,
    write_u32, NodeKind, INTERNAL_CELL_SIZE, INTERNAL_HEADER_SIZE, INTERNAL_KEY_COUNT_OFFSET,
    INTERNAL_RIGHT_CHILD_OFFSET, LEAF_CELL_COUNT_OFFSET, LEAF_HEADER_SIZE, LEAF_KEY_SIZE,
};

/// A page interpreted according to its header.
pub enum Node<B> {
    Leaf(LeafNode<B>),
    Internal(InternalNode<B>),
}

impl<B: AsRef<[u8]>> Node<B> {
    /// Validating constructor: rejects unknown node kinds and counts that
    /// cannot fit in the page.
    pub fn new(buf: B, layout: Layout) -> DbResult<Node<B>> {
        check_len(buf.as_ref(), &layout)?;
        match get_node_type(buf.as_ref())? {
            NodeKind::Leaf => LeafNode::new(buf, layout).map(Node::Leaf),
            NodeKind::Internal => InternalNode::new(buf, layout).map(Node::Internal),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Internal(_) => NodeKind::Internal,
        }
    }

    pub fn is_root(&self) -> bool {
        match self {
            Node::Leaf(leaf) => leaf.is_root(),
            Node::Internal(node) => node.is_root(),
        }
    }
}

fn check_len(page: &[u8], layout: &Layout) -> DbResult<()> {
    if page.len() != layout.page_size() {
        return Err(DbError::Corruption(format!(
            "page is {} bytes, expected {}",
            page.len(),
            layout.page_size()
        )));
    }
    Ok(())
}

pub struct LeafNode<B> {
    buf: B,
    layout: Layout,
}

impl<B: AsRef<[u8]>> LeafNode<B> {
    pub fn new(buf: B, layout: Layout) -> DbResult<Self> {
        check_len(buf.as_ref(), &layout)?;
        let kind = get_node_type(buf.as_ref())?;
        if kind != NodeKind::Leaf {
            return Err(DbError::Corruption(format!("expected a leaf node, found {:?}", kind)));
        }
        let node = LeafNode { buf, layout };
        if node.cell_count() > layout.leaf_max_cells() {
            return Err(DbError::Corruption(format!(
                "leaf claims {} cells, at most {} fit",
                node.cell_count(),
                layout.leaf_max_cells()
            )));
        }
        Ok(node)
    }

    fn bytes(&self) -> &[u8] {
        self.buf.as_ref()
    }

    fn cell_offset(&self, cell: usize) -> usize {
        LEAF_HEADER_SIZE + cell * self.layout.leaf_cell_size()
    }

    fn check_cell(&self, cell: usize) {
        assert!(
            cell < self.cell_count(),
            "leaf cell {} out of bounds (cell count {})",
            cell,
            self.cell_count()
        );
    }

    pub fn is_root(&self) -> bool {
        get_is_root(self.bytes())
    }

    pub fn parent(&self) -> u32 {
        get_parent(self.bytes())
    }

    pub fn cell_count(&self) -> usize {
        read_u32(self.bytes(), LEAF_CELL_COUNT_OFFSET) as usize
    }

    pub fn is_full(&self) -> bool {
        self.cell_count() >= self.layout.leaf_max_cells()
    }

    pub fn key(&self, cell: usize) -> u32 {
        self.check_cell(cell);
        read_u32(self.bytes(), self.cell_offset(cell))
    }

    /// The serialized row stored in `cell`.
    pub fn value(&self, cell: usize) -> &[u8] {
        self.check_cell(cell);
        let start = self.cell_offset(cell) + LEAF_KEY_SIZE;
        &self.bytes()[start..start + self.layout.row_size()]
    }

    pub fn keys(&self) -> Vec<u32> {
        (0..self.cell_count()).map(|cell| self.key(cell)).collect()
    }

    /// Largest key in the leaf. Must not be called on an empty leaf.
    pub fn max_key(&self) -> u32 {
        let count = self.cell_count();
        assert!(count > 0, "max key requested on an empty leaf");
        self.key(count - 1)
    }

    /// Smallest cell index whose key is >= `key`; `cell_count()` if none.
    pub fn search(&self, key: u32) -> usize {
        let mut min_index = 0;
        let mut one_past_max_index = self.cell_count();
        while one_past_max_index != min_index {
            let index = (min_index + one_past_max_index) / 2;
            let key_at_index = self.key(index);
            if key == key_at_index {
                return index;
            }
            if key < key_at_index {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }
        min_index
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> LeafNode<B> {
    /// Zero the page and format it as an empty, non-root leaf.
    pub fn initialize(mut buf: B, layout: Layout) -> Self {
        let page = buf.as_mut();
        page.fill(0);
        set_node_type(page, NodeKind::Leaf);
        set_is_root(page, false);
        LeafNode { buf, layout }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut()
    }

    pub fn set_root(&mut self, is_root: bool) {
        set_is_root(self.bytes_mut(), is_root);
    }

    pub fn set_parent(&mut self, parent: u32) {
        set_parent(self.bytes_mut(), parent);
    }

    pub fn set_cell_count(&mut self, count: usize) {
        assert!(
            count <= self.layout.leaf_max_cells(),
            "leaf cell count {} exceeds capacity {}",
            count,
            self.layout.leaf_max_cells()
        );
        write_u32(self.bytes_mut(), LEAF_CELL_COUNT_OFFSET, count as u32);
    }

    pub fn set_key(&mut self, cell: usize, key: u32) {
        self.check_cell(cell);
        let offset = self.cell_offset(cell);
        write_u32(self.bytes_mut(), offset, key);
    }

    pub fn value_mut(&mut self, cell: usize) -> &mut [u8] {
        self.check_cell(cell);
        let start = self.cell_offset(cell) + LEAF_KEY_SIZE;
        let len = self.layout.row_size();
        &mut self.bytes_mut()[start..start + len]
    }

    pub fn set_cell(&mut self, cell: usize, key: u32, value: &[u8]) {
        self.set_key(cell, key);
        self.value_mut(cell).copy_from_slice(value);
    }

    /// Insert at `index`, moving every cell at or after it one slot right.
    /// The leaf must have room.
    pub fn insert_cell(&mut self, index: usize, key: u32, value: &[u8]) {
        let count = self.cell_count();
        assert!(index <= count, "insert position {} past cell count {}", index, count);
        self.set_cell_count(count + 1);

        let cell_size = self.layout.leaf_cell_size();
        let from = self.cell_offset(index);
        let to = self.cell_offset(count);
        self.bytes_mut().copy_within(from..to, from + cell_size);

        self.set_cell(index, key, value);
    }

    /// Replace the node's cells with `cells`, zeroing any slots left over.
    pub fn write_all(&mut self, cells: &[(u32, Vec<u8>)]) {
        let used_end = self.cell_offset(cells.len());
        let old_end = self.cell_offset(self.cell_count());
        if old_end > used_end {
            self.bytes_mut()[used_end..old_end].fill(0);
        }

        self.set_cell_count(cells.len());
        for (cell, (key, value)) in cells.iter().enumerate() {
            self.set_cell(cell, *key, value);
        }
    }
}

pub struct InternalNode<B> {
    buf: B,
    layout: Layout,
}

impl<B: AsRef<[u8]>> InternalNode<B> {
    pub fn new(buf: B, layout: Layout) -> DbResult<Self> {
        check_len(buf.as_ref(), &layout)?;
        let kind = get_node_type(buf.as_ref())?;
        if kind != NodeKind::Internal {
            return Err(DbError::Corruption(format!("expected an internal node, found {:?}", kind)));
        }
        let node = InternalNode { buf, layout };
        // An internal node always has at least one key; the upper bound is the
        // fan-out this table was opened with, which may be below page capacity.
        let count = node.key_count();
        if count == 0 || count > layout.internal_max_cells() {
            return Err(DbError::Corruption(format!(
                "internal node claims {} keys, expected 1 to {}",
                count,
                layout.internal_max_cells()
            )));
        }
        Ok(node)
    }

    fn bytes(&self) -> &[u8] {
        self.buf.as_ref()
    }

    fn cell_offset(cell: usize) -> usize {
        INTERNAL_HEADER_SIZE + cell * INTERNAL_CELL_SIZE
    }

    fn check_cell(&self, cell: usize) {
        assert!(
            cell < self.key_count(),
            "internal cell {} out of bounds (key count {})",
            cell,
            self.key_count()
        );
    }

    pub fn is_root(&self) -> bool {
        get_is_root(self.bytes())
    }

    pub fn parent(&self) -> u32 {
        get_parent(self.bytes())
    }

    pub fn key_count(&self) -> usize {
        read_u32(self.bytes(), INTERNAL_KEY_COUNT_OFFSET) as usize
    }

    pub fn is_full(&self) -> bool {
        self.key_count() >= self.layout.internal_max_cells()
    }

    pub fn right_child(&self) -> u32 {
        read_u32(self.bytes(), INTERNAL_RIGHT_CHILD_OFFSET)
    }

    pub fn child(&self, cell: usize) -> u32 {
        self.check_cell(cell);
        read_u32(self.bytes(), Self::cell_offset(cell))
    }

    pub fn key(&self, cell: usize) -> u32 {
        self.check_cell(cell);
        read_u32(self.bytes(), Self::cell_offset(cell) + 4)
    }

    /// Child pointer `index` counting the right child as slot `key_count()`.
    pub fn child_or_right(&self, index: usize) -> u32 {
        if index == self.key_count() {
            self.right_child()
        } else {
            self.child(index)
        }
    }

    pub fn keys(&self) -> Vec<u32> {
        (0..self.key_count()).map(|cell| self.key(cell)).collect()
    }

    /// All child pointers left to right, right child last.
    pub fn children(&self) -> Vec<u32> {
        (0..=self.key_count()).map(|index| self.child_or_right(index)).collect()
    }

    /// Smallest cell index whose key is >= `key`; `key_count()` selects the
    /// right child.
    pub fn search(&self, key: u32) -> usize {
        let mut min_index = 0;
        let mut max_index = self.key_count();
        while min_index != max_index {
            let index = (min_index + max_index) / 2;
            if self.key(index) >= key {
                max_index = index;
            } else {
                min_index = index + 1;
            }
        }
        min_index
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> InternalNode<B> {
    /// Zero the page and format it as an empty, non-root internal node.
    pub fn initialize(mut buf: B, layout: Layout) -> Self {
        let page = buf.as_mut();
        page.fill(0);
        set_node_type(page, NodeKind::Internal);
        set_is_root(page, false);
        InternalNode { buf, layout }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut()
    }

    pub fn set_root(&mut self, is_root: bool) {
        set_is_root(self.bytes_mut(), is_root);
    }

    pub fn set_parent(&mut self, parent: u32) {
        set_parent(self.bytes_mut(), parent);
    }

    pub fn set_key_count(&mut self, count: usize) {
        assert!(
            count <= self.layout.internal_max_cells(),
            "internal key count {} exceeds capacity {}",
            count,
            self.layout.internal_max_cells()
        );
        write_u32(self.bytes_mut(), INTERNAL_KEY_COUNT_OFFSET, count as u32);
    }

    pub fn set_right_child(&mut self, page_num: u32) {
        write_u32(self.bytes_mut(), INTERNAL_RIGHT_CHILD_OFFSET, page_num);
    }

    pub fn set_child(&mut self, cell: usize, page_num: u32) {
        self.check_cell(cell);
        write_u32(self.bytes_mut(), Self::cell_offset(cell), page_num);
    }

    pub fn set_key(&mut self, cell: usize, key: u32) {
        self.check_cell(cell);
        write_u32(self.bytes_mut(), Self::cell_offset(cell) + 4, key);
    }

    /// Replace the node's contents. `children.len()` must be `keys.len() + 1`;
    /// the last child becomes the right child.
    pub fn write_all(&mut self, keys: &[u32], children: &[u32]) {
        assert_eq!(
            children.len(),
            keys.len() + 1,
            "internal node needs one more child than keys"
        );
        let used_end = Self::cell_offset(keys.len());
        let old_end = Self::cell_offset(self.key_count());
        if old_end > used_end {
            self.bytes_mut()[used_end..old_end].fill(0);
        }

        self.set_key_count(keys.len());
        for (cell, (&key, &child)) in keys.iter().zip(children).enumerate() {
            self.set_child(cell, child);
            self.set_key(cell, key);
        }
        self.set_right_child(children[keys.len()]);
    }
}
