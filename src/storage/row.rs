use std::fmt;

use crate::error::{DbError, DbResult};
use crate::storage::layout::Layout;

/// One fixed-width record: `id` is the B-tree key, the two text columns are
/// stored in zero-padded buffers one byte wider than their maximum length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Self {
        Row { id, username: username.into(), email: email.into() }
    }

    /// Check both text columns against the widths in `layout`. Columns are
    /// NUL-terminated on disk, so an embedded NUL is refused too.
    pub fn validate(&self, layout: &Layout) -> DbResult<()> {
        if self.username.contains('\0') {
            return Err(DbError::NulInString { column: "username" });
        }
        if self.email.contains('\0') {
            return Err(DbError::NulInString { column: "email" });
        }
        if self.username.len() > layout.username_size() {
            return Err(DbError::StringTooLong { column: "username", max: layout.username_size() });
        }
        if self.email.len() > layout.email_size() {
            return Err(DbError::StringTooLong { column: "email", max: layout.email_size() });
        }
        Ok(())
    }

    /// Write the row into `dest`, which must be exactly `layout.row_size()` bytes.
    pub fn serialize(&self, dest: &mut [u8], layout: &Layout) -> DbResult<()> {
        self.validate(layout)?;
        assert_eq!(dest.len(), layout.row_size(), "row buffer has the wrong size");

        dest.fill(0);
        dest[..4].copy_from_slice(&self.id.to_le_bytes());

        let start = layout.username_offset();
        dest[start..start + self.username.len()].copy_from_slice(self.username.as_bytes());

        let start = layout.email_offset();
        dest[start..start + self.email.len()].copy_from_slice(self.email.as_bytes());
        Ok(())
    }

    pub fn deserialize(src: &[u8], layout: &Layout) -> DbResult<Row> {
        if src.len() < layout.row_size() {
            return Err(DbError::Corruption(format!(
                "row needs {} bytes, found {}",
                layout.row_size(),
                src.len()
            )));
        }
        let mut id_bytes = [0u8; 4];
        id_bytes.copy_from_slice(&src[..4]);

        let username_start = layout.username_offset();
        let email_start = layout.email_offset();
        let username = read_text(&src[username_start..email_start], "username")?;
        let email = read_text(&src[email_start..layout.row_size()], "email")?;

        Ok(Row { id: u32::from_le_bytes(id_bytes), username, email })
    }
}

/// Decode a zero-terminated column buffer.
fn read_text(field: &[u8], column: &str) -> DbResult<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8(field[..end].to_vec())
        .map_err(|_| DbError::Corruption(format!("column '{}' is not valid UTF-8", column)))
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}
