pub mod storage;
pub mod table;
pub mod command;
pub mod error;
