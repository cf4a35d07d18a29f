use std::path::Path;

use log::{debug, info};

use crate::error::{DbError, DbResult};
use crate::storage::btree::BTree;
use crate::storage::layout::{Layout, TableConfig};
use crate::storage::node::{LeafNode, Node};
use crate::storage::pager::Pager;
use crate::storage::row::Row;

/// The single table stored in one database file. Page 0 is always its root.
pub struct Table {
    pager: Pager,
    root_page: u32,
}

impl Table {
    /// Open (or create) a table with the default layout.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Table> {
        Table::open_with(path, TableConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: TableConfig) -> DbResult<Table> {
        let layout = Layout::new(&config)?;
        let mut pager = Pager::open(path, layout, config.max_pages)?;

        if pager.num_pages() == 0 {
            info!("Initializing new database: allocating page 0 as leaf root.");
            let root = pager.allocate_page()?;
            let page = pager.get_page(root)?;
            let mut leaf = LeafNode::initialize(&mut page.data[..], layout);
            leaf.set_root(true);
        } else {
            let page = pager.get_page(0)?;
            let root = Node::new(&page.data[..], layout)?;
            if !root.is_root() {
                return Err(DbError::Corruption("page 0 is not marked as the root".into()));
            }
            debug!("Opening existing database: page 0 is a {:?} root.", root.kind());
        }

        Ok(Table { pager, root_page: 0 })
    }

    /// B-tree handle over this table's pages.
    pub fn tree(&mut self) -> BTree<'_> {
        BTree::open_root(&mut self.pager, self.root_page)
    }

    pub fn layout(&self) -> &Layout {
        self.pager.layout()
    }

    pub fn root_page(&self) -> u32 {
        self.root_page
    }

    pub fn num_pages(&self) -> u32 {
        self.pager.num_pages()
    }

    pub fn insert(&mut self, row: &Row) -> DbResult<()> {
        self.tree().insert(row)
    }

    pub fn find(&mut self, id: u32) -> DbResult<Option<Row>> {
        self.tree().get(id)
    }

    /// All rows in ascending id order.
    pub fn scan(&mut self) -> DbResult<Vec<Row>> {
        self.tree().scan()
    }

    /// Flush every page and release the file.
    pub fn close(self) -> DbResult<()> {
        self.pager.close()
    }
}
