use thiserror::Error;
use std::io;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("duplicate key {0}")]
    DuplicateKey(u32),
    #[error("table full: page limit of {max_pages} reached")]
    TableFull { max_pages: u32 },
    #[error("value for column '{column}' is longer than {max} bytes")]
    StringTooLong { column: &'static str, max: usize },
    #[error("value for column '{column}' contains a NUL byte")]
    NulInString { column: &'static str },
    #[error("corrupt database file: {0}")]
    Corruption(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("id must be positive")]
    NegativeId,
    #[error("unrecognized command '{0}'")]
    UnrecognizedCommand(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DbResult<T> = Result<T, DbError>;
