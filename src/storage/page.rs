// ┌─────────────────────────────────────────────────────────────────────────┐
// │ Offset │ Length │ Description                                           │
// │────────┼────────┼───────────────────────────────────────────────────────│
// │   0    │   1    │ NODE_TYPE (0 = internal, 1 = leaf)                    │
// │   1    │   1    │ IS_ROOT   (0 = false, 1 = true)                       │
// │   2    │   4    │ PARENT_PAGE (u32): page number of parent (0 if none)  │
// │────────┼────────┼───────────────────────────────────────────────────────│
// │ Leaf:      6 CELL_COUNT (u32), cells from 10: [key u32][row bytes]     │
// │ Internal:  6 KEY_COUNT (u32), 10 RIGHT_CHILD (u32),                    │
// │            cells from 14: [child u32][key u32]                         │
// └─────────────────────────────────────────────────────────────────────────┘

use crate::error::{DbError, DbResult};

pub const DEFAULT_PAGE_SIZE: usize = 4096;

pub const NODE_TYPE_OFFSET: usize   = 0;          // 1 byte
pub const IS_ROOT_OFFSET: usize     = 1;          // 1 byte
pub const PARENT_PAGE_OFFSET: usize = 2;          // 4 bytes (u32)
pub const COMMON_HEADER_SIZE: usize = 6;

pub const LEAF_CELL_COUNT_OFFSET: usize = COMMON_HEADER_SIZE;     // 4 bytes (u32)
pub const LEAF_HEADER_SIZE: usize       = COMMON_HEADER_SIZE + 4;
pub const LEAF_KEY_SIZE: usize          = 4;

pub const INTERNAL_KEY_COUNT_OFFSET: usize   = COMMON_HEADER_SIZE;                // 4 bytes (u32)
pub const INTERNAL_RIGHT_CHILD_OFFSET: usize = INTERNAL_KEY_COUNT_OFFSET + 4;     // 4 bytes (u32)
pub const INTERNAL_HEADER_SIZE: usize        = INTERNAL_RIGHT_CHILD_OFFSET + 4;
pub const INTERNAL_CELL_SIZE: usize          = 8;                                 // child + key

pub const NODE_INTERNAL: u8 = 0;
pub const NODE_LEAF: u8     = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Internal,
    Leaf,
}

impl TryFrom<u8> for NodeKind {
    type Error = DbError;

    fn try_from(value: u8) -> DbResult<Self> {
        match value {
            NODE_INTERNAL => Ok(NodeKind::Internal),
            NODE_LEAF => Ok(NodeKind::Leaf),
            other => Err(DbError::Corruption(format!("unknown node type {}", other))),
        }
    }
}

impl From<NodeKind> for u8 {
    fn from(kind: NodeKind) -> u8 {
        match kind {
            NodeKind::Internal => NODE_INTERNAL,
            NodeKind::Leaf => NODE_LEAF,
        }
    }
}

pub(crate) fn read_u32(page: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&page[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

pub(crate) fn write_u32(page: &mut [u8], offset: usize, value: u32) {
    page[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Given a raw page buffer, read its node type (internal vs. leaf).
pub fn get_node_type(page: &[u8]) -> DbResult<NodeKind> {
    NodeKind::try_from(page[NODE_TYPE_OFFSET])
}

/// Set the node type (internal=0, leaf=1).
pub fn set_node_type(page: &mut [u8], kind: NodeKind) {
    page[NODE_TYPE_OFFSET] = kind.into();
}

/// Read the “is_root” flag.
pub fn get_is_root(page: &[u8]) -> bool {
    page[IS_ROOT_OFFSET] != 0
}

/// Set or clear the “is_root” flag.
pub fn set_is_root(page: &mut [u8], is_root: bool) {
    page[IS_ROOT_OFFSET] = if is_root { 1 } else { 0 };
}

/// Read the parent page number (u32).
pub fn get_parent(page: &[u8]) -> u32 {
    read_u32(page, PARENT_PAGE_OFFSET)
}

/// Set the parent page number (u32).
pub fn set_parent(page: &mut [u8], parent: u32) {
    write_u32(page, PARENT_PAGE_OFFSET, parent);
}
