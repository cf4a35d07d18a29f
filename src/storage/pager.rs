use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, info};

use crate::error::{DbError, DbResult};
use crate::storage::layout::Layout;

/// A single page of data, `layout.page_size()` bytes long.
pub struct Page {
    pub data: Box<[u8]>,
}

impl Page {
    pub fn new(page_size: usize) -> Self {
        Page { data: vec![0; page_size].into_boxed_slice() }
    }
}

/// Pager: manages reading/writing pages from/into the database file, and
/// keeps every page it has handed out in memory until the table is closed.
/// Distinguishes pages already on disk from pages newly allocated in memory.
pub struct Pager {
    file: File,
    layout: Layout,

    /// The number of pages that are already in the file.
    file_length_pages: u32,

    /// High-water mark: every page number below this is allocated
    /// (including any newly allocated ones not yet flushed).
    num_pages: u32,

    /// Optional ceiling on `num_pages`.
    max_pages: Option<u32>,

    /// `cache[page_num] = Some(Box<Page>)` once that page has been touched.
    cache: Vec<Option<Box<Page>>>,
}

impl Pager {
    /// Open (or create) the database file at `path`.
    /// A file whose length is not a whole number of pages is rejected.
    pub fn open(path: impl AsRef<Path>, layout: Layout, max_pages: Option<u32>) -> DbResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let file_len = file.metadata()?.len();
        let page_size = layout.page_size() as u64;

        if file_len % page_size != 0 {
            return Err(DbError::Corruption(format!(
                "file length {} is not a multiple of the {}-byte page size",
                file_len, page_size
            )));
        }
        let file_length_pages = u32::try_from(file_len / page_size).map_err(|_| {
            DbError::Corruption(format!("file holds more than {} pages", u32::MAX))
        })?;
        if let Some(max) = max_pages {
            if file_length_pages > max {
                return Err(DbError::TableFull { max_pages: max });
            }
        }

        info!("Opened {} with {} page(s)", path.display(), file_length_pages);

        Ok(Pager {
            file,
            layout,
            file_length_pages,
            num_pages: file_length_pages,
            max_pages,
            cache: Vec::new(),
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Return a mutable reference to the requested page, loading from disk if it already existed.
    ///
    /// A page number at or past the high-water mark extends it immediately and
    /// yields a zeroed page.
    pub fn get_page(&mut self, page_num: u32) -> DbResult<&mut Page> {
        self.check_limit(page_num)?;

        let index = page_num as usize;
        if self.cache.len() <= index {
            self.cache.resize_with(index + 1, || None);
        }

        let page = match self.cache[index].take() {
            Some(page) => page,
            None => self.read_page(page_num)?,
        };
        if page_num >= self.num_pages {
            self.num_pages = page_num + 1;
        }
        let page: &mut Page = self.cache[index].insert(page);
        Ok(page)
    }

    fn read_page(&mut self, page_num: u32) -> DbResult<Box<Page>> {
        let page_size = self.layout.page_size();
        let mut page = Box::new(Page::new(page_size));

        // Only pages that existed in the file have anything to read.
        if page_num < self.file_length_pages {
            debug!("Reading page {} from disk", page_num);
            let offset = page_num as u64 * page_size as u64;
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.read_exact(&mut page.data)?;
        }
        Ok(page)
    }

    fn check_limit(&self, page_num: u32) -> DbResult<()> {
        match self.max_pages {
            Some(max) if page_num >= max => Err(DbError::TableFull { max_pages: max }),
            _ => Ok(()),
        }
    }

    /// Hand out the next unused page number. Pages are never reused.
    pub fn allocate_page(&mut self) -> DbResult<u32> {
        let new_page_num = self.num_pages;
        self.check_limit(new_page_num)?;
        self.num_pages += 1;
        debug!("Allocated page {}", new_page_num);
        Ok(new_page_num)
    }

    /// Fail with `TableFull` unless `count` more pages can still be allocated.
    pub fn reserve(&self, count: u32) -> DbResult<()> {
        match self.max_pages {
            Some(max) if self.num_pages as u64 + count as u64 > max as u64 => {
                Err(DbError::TableFull { max_pages: max })
            }
            _ => Ok(()),
        }
    }

    /// Write the cached page `page_num` back to disk. Pages below the high-water
    /// mark that were never touched are written as zeros so the file never has holes.
    pub fn flush_page(&mut self, page_num: u32) -> DbResult<()> {
        let page_size = self.layout.page_size();
        let offset = page_num as u64 * page_size as u64;

        match self.cache.get(page_num as usize).and_then(|slot| slot.as_deref()) {
            Some(page) => {
                self.file.seek(SeekFrom::Start(offset))?;
                self.file.write_all(&page.data)?;
            }
            None if page_num >= self.file_length_pages => {
                self.file.seek(SeekFrom::Start(offset))?;
                self.file.write_all(&vec![0u8; page_size])?;
            }
            None => return Ok(()),
        }

        if page_num >= self.file_length_pages {
            self.file_length_pages = page_num + 1;
        }
        Ok(())
    }

    /// Write every page back in ascending page order.
    pub fn flush_all(&mut self) -> DbResult<()> {
        for page_num in 0..self.num_pages {
            self.flush_page(page_num)?;
        }
        self.file.sync_all()?;
        debug!("Flushed {} page(s)", self.num_pages);
        Ok(())
    }

    /// Flush everything and release the file.
    pub fn close(mut self) -> DbResult<()> {
        self.flush_all()?;
        info!("Closed database file ({} page(s))", self.num_pages);
        Ok(())
    }

    /// How many pages are in the file right now?
    pub fn file_length_pages(&self) -> u32 {
        self.file_length_pages
    }

    /// How many pages does the pager know about right now (on-disk + newly allocated)?
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }
}
