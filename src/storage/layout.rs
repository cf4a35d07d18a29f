use std::fmt;

use crate::error::{DbError, DbResult};
use crate::storage::page::{
    COMMON_HEADER_SIZE, DEFAULT_PAGE_SIZE, INTERNAL_CELL_SIZE, INTERNAL_HEADER_SIZE,
    LEAF_HEADER_SIZE, LEAF_KEY_SIZE,
};

pub const COLUMN_USERNAME_SIZE: usize = 32;
pub const COLUMN_EMAIL_SIZE: usize = 255;
const ID_SIZE: usize = 4;

/// Knobs a table is opened with. The defaults give the reference sizing:
/// 4 KiB pages, 32-byte usernames, 255-byte emails, no page ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub page_size: usize,
    pub username_size: usize,
    pub email_size: usize,
    /// Upper bound on the number of pages in the file; `None` means unbounded.
    pub max_pages: Option<u32>,
    /// Lowers the internal-node fan-out below what the page could hold.
    pub internal_max_cells: Option<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            page_size: DEFAULT_PAGE_SIZE,
            username_size: COLUMN_USERNAME_SIZE,
            email_size: COLUMN_EMAIL_SIZE,
            max_pages: None,
            internal_max_cells: None,
        }
    }
}

/// Every size, offset and capacity derived from a `TableConfig`.
/// Computed once when the table is opened and copied into each node view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    page_size: usize,
    username_size: usize,
    email_size: usize,
    row_size: usize,
    leaf_cell_size: usize,
    leaf_max_cells: usize,
    internal_max_cells: usize,
}

impl Layout {
    pub fn new(config: &TableConfig) -> DbResult<Layout> {
        // string columns carry a trailing terminator byte
        let row_size = ID_SIZE + config.username_size + 1 + config.email_size + 1;
        let leaf_cell_size = LEAF_KEY_SIZE + row_size;

        let leaf_space = config
            .page_size
            .checked_sub(LEAF_HEADER_SIZE)
            .ok_or_else(|| DbError::InvalidConfig(format!("page size {} is too small", config.page_size)))?;
        let leaf_max_cells = leaf_space / leaf_cell_size;
        if leaf_max_cells == 0 {
            return Err(DbError::InvalidConfig(format!(
                "a {}-byte row does not fit in a {}-byte page",
                row_size, config.page_size
            )));
        }

        let internal_capacity = config.page_size.saturating_sub(INTERNAL_HEADER_SIZE) / INTERNAL_CELL_SIZE;
        let internal_max_cells = config.internal_max_cells.unwrap_or(internal_capacity);
        if internal_max_cells < 2 || internal_max_cells > internal_capacity {
            return Err(DbError::InvalidConfig(format!(
                "internal node fan-out must be between 2 and {}, got {}",
                internal_capacity, internal_max_cells
            )));
        }

        Ok(Layout {
            page_size: config.page_size,
            username_size: config.username_size,
            email_size: config.email_size,
            row_size,
            leaf_cell_size,
            leaf_max_cells,
            internal_max_cells,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Longest username accepted, terminator excluded.
    pub fn username_size(&self) -> usize {
        self.username_size
    }

    /// Longest email accepted, terminator excluded.
    pub fn email_size(&self) -> usize {
        self.email_size
    }

    pub fn row_size(&self) -> usize {
        self.row_size
    }

    pub fn username_offset(&self) -> usize {
        ID_SIZE
    }

    pub fn email_offset(&self) -> usize {
        ID_SIZE + self.username_size + 1
    }

    pub fn leaf_cell_size(&self) -> usize {
        self.leaf_cell_size
    }

    pub fn leaf_space_for_cells(&self) -> usize {
        self.page_size - LEAF_HEADER_SIZE
    }

    pub fn leaf_max_cells(&self) -> usize {
        self.leaf_max_cells
    }

    /// Cells kept by the original page when a full leaf splits: ceil((MAX + 1) / 2).
    pub fn leaf_left_split_count(&self) -> usize {
        (self.leaf_max_cells + 2) / 2
    }

    pub fn leaf_right_split_count(&self) -> usize {
        self.leaf_max_cells + 1 - self.leaf_left_split_count()
    }

    pub fn internal_max_cells(&self) -> usize {
        self.internal_max_cells
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ROW_SIZE: {}", self.row_size)?;
        writeln!(f, "COMMON_NODE_HEADER_SIZE: {}", COMMON_HEADER_SIZE)?;
        writeln!(f, "LEAF_NODE_HEADER_SIZE: {}", LEAF_HEADER_SIZE)?;
        writeln!(f, "LEAF_NODE_CELL_SIZE: {}", self.leaf_cell_size)?;
        writeln!(f, "LEAF_NODE_SPACE_FOR_CELLS: {}", self.leaf_space_for_cells())?;
        writeln!(f, "LEAF_NODE_MAX_CELLS: {}", self.leaf_max_cells)?;
        write!(f, "INTERNAL_NODE_MAX_CELLS: {}", self.internal_max_cells)
    }
}
