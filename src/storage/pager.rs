//! # Pager
//!
//! The pager owns the mapped file and layers page-lifecycle management on
//! top of [`MmapStorage`]: open-or-create with metadata initialization,
//! free-list allocation and reuse, demand growth with capacity doubling,
//! and flush.
//!
//! ## Free List
//!
//! Freed pages form a singly linked list threaded through the pages
//! themselves: the metadata header holds the head id, and each free page
//! stores its successor's id (little-endian) in its first 4 bytes. The
//! rest of a free page is left as-is. Allocation pops the head; freeing
//! pushes, so reuse is LIFO. Page 0 is never freed.
//!
//! ## Growth
//!
//! Fresh ids come from the `num_pages` watermark in the metadata. When the
//! watermark passes the mapped capacity, the file doubles until the
//! requirement fits and the mapping is replaced. Because growth takes
//! `&mut self`, the borrow checker guarantees no page view survives it;
//! callers re-fetch pages (and the metadata view) after any call that can
//! allocate.

use std::path::Path;

use eyre::{Result, WrapErr};
use zerocopy::IntoBytes;

use super::meta::{MetaHeader, META_HEADER_SIZE};
use super::mmap::MmapStorage;
use crate::config::{GROWTH_FACTOR, INITIAL_PAGES, INVALID_PAGE};

#[derive(Debug)]
pub struct Pager {
    storage: MmapStorage,
}

impl Pager {
    /// Opens an index file, creating and initializing it when absent or
    /// empty. Fresh files are sized to `INITIAL_PAGES` pages up front.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let fresh = match std::fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let pager = if fresh {
            let storage = MmapStorage::create(path, INITIAL_PAGES)?;
            let mut pager = Self { storage };
            let page = pager.storage.page_mut(0)?;
            page[..META_HEADER_SIZE].copy_from_slice(MetaHeader::new().as_bytes());
            pager
        } else {
            let storage = MmapStorage::open(path)?;
            MetaHeader::from_bytes(storage.page(0)?)
                .wrap_err_with(|| format!("'{}' is not a valid index file", path.display()))?;
            Self { storage }
        };

        pager.storage.advise_random();
        pager.storage.prefetch_pages(0, 4);

        Ok(pager)
    }

    pub fn page(&self, page_no: u32) -> Result<&[u8]> {
        self.storage.page(page_no)
    }

    /// Mutable page view. Grows the file first when `page_no` lies beyond
    /// the mapped capacity.
    pub fn page_mut(&mut self, page_no: u32) -> Result<&mut [u8]> {
        if page_no >= self.storage.page_count() {
            self.ensure_capacity(page_no.checked_add(1).unwrap_or(u32::MAX))?;
        }
        self.storage.page_mut(page_no)
    }

    pub fn meta(&self) -> Result<&MetaHeader> {
        MetaHeader::from_bytes(self.storage.page(0)?)
    }

    pub fn meta_mut(&mut self) -> Result<&mut MetaHeader> {
        MetaHeader::from_bytes_mut(self.storage.page_mut(0)?)
    }

    /// Returns a page id for the caller to initialize: either the head of
    /// the free list or a fresh id past the watermark. The page's contents
    /// are unspecified.
    pub fn allocate_page(&mut self) -> Result<u32> {
        let free_head = self.meta()?.free_list_head();

        if free_head != INVALID_PAGE {
            let next = {
                let page = self.storage.page(free_head)?;
                u32::from_le_bytes(page[..4].try_into().unwrap())
            };
            self.meta_mut()?.set_free_list_head(next);
            return Ok(free_head);
        }

        let id = self.meta()?.num_pages();
        self.ensure_capacity(id + 1)
            .wrap_err_with(|| format!("failed to grow index file for page {}", id))?;
        self.meta_mut()?.set_num_pages(id + 1);
        Ok(id)
    }

    /// Pushes `page_no` onto the free list. Freeing the metadata page is
    /// silently ignored.
    pub fn free_page(&mut self, page_no: u32) -> Result<()> {
        if page_no == 0 {
            return Ok(());
        }

        let head = self.meta()?.free_list_head();
        {
            let page = self.storage.page_mut(page_no)?;
            page[..4].copy_from_slice(&head.to_le_bytes());
        }
        self.meta_mut()?.set_free_list_head(page_no);
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.storage.sync()
    }

    pub fn page_count(&self) -> u32 {
        self.storage.page_count()
    }

    pub fn file_size(&self) -> u64 {
        self.storage.file_size()
    }

    pub fn prefetch(&self, start_page: u32, count: u32) {
        self.storage.prefetch_pages(start_page, count)
    }

    fn ensure_capacity(&mut self, required_pages: u32) -> Result<()> {
        let current = self.storage.page_count();
        if required_pages <= current {
            return Ok(());
        }

        let mut target = current.max(1);
        while target < required_pages {
            target = target.saturating_mul(GROWTH_FACTOR);
        }
        self.storage.grow(target)
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        // Scope-exit durability path; errors here have no caller to reach.
        let _ = self.storage.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{META_MAGIC, PAGE_SIZE};
    use tempfile::tempdir;

    #[test]
    fn open_creates_and_initializes_fresh_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.db");

        let pager = Pager::open(&path).unwrap();

        assert_eq!(pager.page_count(), INITIAL_PAGES);
        let meta = pager.meta().unwrap();
        assert_eq!(meta.magic(), META_MAGIC);
        assert_eq!(meta.root_page_id(), INVALID_PAGE);
        assert_eq!(meta.num_pages(), 1);
        assert_eq!(meta.num_records(), 0);
    }

    #[test]
    fn open_rejects_foreign_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notanindex.db");
        std::fs::write(&path, vec![0xABu8; PAGE_SIZE]).unwrap();

        let result = Pager::open(&path);
        assert!(result.is_err());
    }

    #[test]
    fn reopen_preserves_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.db");

        {
            let mut pager = Pager::open(&path).unwrap();
            let meta = pager.meta_mut().unwrap();
            meta.set_root_page_id(3);
            meta.set_num_records(99);
            pager.sync().unwrap();
        }

        let pager = Pager::open(&path).unwrap();
        let meta = pager.meta().unwrap();
        assert_eq!(meta.root_page_id(), 3);
        assert_eq!(meta.num_records(), 99);
    }

    #[test]
    fn allocation_starts_after_metadata_page() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("index.db")).unwrap();

        assert_eq!(pager.allocate_page().unwrap(), 1);
        assert_eq!(pager.allocate_page().unwrap(), 2);
        assert_eq!(pager.allocate_page().unwrap(), 3);
        assert_eq!(pager.meta().unwrap().num_pages(), 4);
    }

    #[test]
    fn freed_pages_are_reused_lifo() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("index.db")).unwrap();

        let a = pager.allocate_page().unwrap();
        let b = pager.allocate_page().unwrap();
        let c = pager.allocate_page().unwrap();

        pager.free_page(a).unwrap();
        pager.free_page(c).unwrap();

        assert_eq!(pager.allocate_page().unwrap(), c);
        assert_eq!(pager.allocate_page().unwrap(), a);

        // list drained, next id comes from the watermark
        let fresh = pager.allocate_page().unwrap();
        assert_eq!(fresh, b + 2);
        assert_eq!(pager.meta().unwrap().num_pages(), 5);
    }

    #[test]
    fn free_list_links_through_page_bytes() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("index.db")).unwrap();

        let a = pager.allocate_page().unwrap();
        let b = pager.allocate_page().unwrap();

        pager.free_page(a).unwrap();
        pager.free_page(b).unwrap();

        assert_eq!(pager.meta().unwrap().free_list_head(), b);
        let link = u32::from_le_bytes(pager.page(b).unwrap()[..4].try_into().unwrap());
        assert_eq!(link, a);
        let link = u32::from_le_bytes(pager.page(a).unwrap()[..4].try_into().unwrap());
        assert_eq!(link, INVALID_PAGE);
    }

    #[test]
    fn metadata_page_cannot_be_freed() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("index.db")).unwrap();

        pager.free_page(0).unwrap();
        assert_eq!(pager.meta().unwrap().free_list_head(), INVALID_PAGE);
    }

    #[test]
    fn page_mut_grows_on_demand() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("index.db")).unwrap();

        assert!(pager.page(INITIAL_PAGES).is_err());
        pager.page_mut(INITIAL_PAGES).unwrap();
        assert_eq!(pager.page_count(), INITIAL_PAGES * 2);
    }
}
