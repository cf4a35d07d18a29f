pub mod btree;
pub mod cursor;
pub mod layout;
pub mod node;
pub mod page;
pub mod pager;
pub mod row;
