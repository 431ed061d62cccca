//! # Memory-Mapped File Storage
//!
//! `MmapStorage` owns the backing file and its read-write shared mapping,
//! and hands out 4096-byte page windows into it. The mapping is the only
//! copy of the data: mutations through `page_mut` land directly in the OS
//! page cache and reach disk on `sync` (or asynchronously at the kernel's
//! leisure).
//!
//! ## Safety Model
//!
//! A memory-mapped region becomes invalid when the file grows and is
//! remapped. Instead of runtime tracking (hazard pointers, epochs,
//! reference counts), the borrow checker enforces the invariant at compile
//! time:
//!
//! ```text
//! page(&self) -> &[u8]              // shared borrow of the storage
//! page_mut(&mut self) -> &mut [u8]  // exclusive borrow
//! grow(&mut self)                   // exclusive borrow
//! ```
//!
//! Since `grow()` requires `&mut self`, no page reference can be alive
//! across a growth-triggering call. Callers re-fetch pages after any
//! operation that may allocate.
//!
//! ## Access Hints
//!
//! Index traversal touches pages in essentially random order, so the whole
//! mapping is advised `MADV_RANDOM` at open. `prefetch_pages` issues
//! `MADV_WILLNEED` for pages about to be visited (the root vicinity at
//! open, the next child during descent, the next leaf during scans). Both
//! hints are advisory; correctness never depends on them.

use std::fs::{File, OpenOptions};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::MmapMut;

use crate::config::PAGE_SIZE;

#[derive(Debug)]
pub struct MmapStorage {
    file: File,
    mmap: MmapMut,
    page_count: u32,
}

impl MmapStorage {
    /// Opens an existing index file and maps it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open index file '{}'", path.display()))?;

        let metadata = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?;

        let file_size = metadata.len();

        ensure!(
            file_size > 0,
            "cannot open empty index file '{}'",
            path.display()
        );

        ensure!(
            file_size % PAGE_SIZE as u64 == 0,
            "index file '{}' size {} is not a multiple of page size {}",
            path.display(),
            file_size,
            PAGE_SIZE
        );

        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        // SAFETY: MmapMut::map_mut is unsafe because a mapped file can be
        // modified externally, leading to undefined behavior. This is safe
        // because:
        // 1. The file is opened read+write and the index is single-process
        //    by contract; no external writer exists
        // 2. The mmap lifetime is tied to MmapStorage, preventing
        //    use-after-unmap
        // 3. All access goes through page()/page_mut() which bounds-check
        //    the page number
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self {
            file,
            mmap,
            page_count,
        })
    }

    /// Creates (or truncates) an index file sized to `initial_page_count`
    /// pages and maps it. The file contents start zeroed.
    pub fn create<P: AsRef<Path>>(path: P, initial_page_count: u32) -> Result<Self> {
        let path = path.as_ref();

        ensure!(
            initial_page_count > 0,
            "initial page count must be at least 1"
        );

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create index file '{}'", path.display()))?;

        let file_size = initial_page_count as u64 * PAGE_SIZE as u64;

        file.set_len(file_size)
            .wrap_err_with(|| format!("failed to set file size to {} bytes", file_size))?;

        // SAFETY: MmapMut::map_mut is unsafe because a mapped file can be
        // modified externally. This is safe because:
        // 1. We just created this file (truncate=true) and no external
        //    writer exists
        // 2. The file size was set to a valid multiple of PAGE_SIZE above
        // 3. The mmap lifetime is tied to MmapStorage, preventing
        //    use-after-unmap
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self {
            file,
            mmap,
            page_count: initial_page_count,
        })
    }

    pub fn page(&self, page_no: u32) -> Result<&[u8]> {
        ensure!(
            page_no < self.page_count,
            "page {} out of bounds (page_count={})",
            page_no,
            self.page_count
        );

        let offset = page_no as usize * PAGE_SIZE;
        Ok(&self.mmap[offset..offset + PAGE_SIZE])
    }

    pub fn page_mut(&mut self, page_no: u32) -> Result<&mut [u8]> {
        ensure!(
            page_no < self.page_count,
            "page {} out of bounds (page_count={})",
            page_no,
            self.page_count
        );

        let offset = page_no as usize * PAGE_SIZE;
        Ok(&mut self.mmap[offset..offset + PAGE_SIZE])
    }

    /// Extends the file to `new_page_count` pages and replaces the mapping.
    /// Growth never shrinks; a smaller request is a no-op.
    pub fn grow(&mut self, new_page_count: u32) -> Result<()> {
        if new_page_count <= self.page_count {
            return Ok(());
        }

        self.mmap
            .flush_async()
            .wrap_err("failed to flush mapping before grow")?;

        let new_size = new_page_count as u64 * PAGE_SIZE as u64;

        self.file
            .set_len(new_size)
            .wrap_err_with(|| format!("failed to extend file to {} bytes", new_size))?;

        // SAFETY: MmapMut::map_mut is unsafe because the old mapping becomes
        // invalid. This is safe because:
        // 1. grow() takes &mut self, so the borrow checker guarantees no
        //    page references exist at this point
        // 2. The old mapping was flushed above, so nothing is lost if the
        //    remap relocates
        // 3. The file was extended to new_size before remapping
        // 4. The old mapping is dropped when the new one is assigned
        self.mmap =
            unsafe { MmapMut::map_mut(&self.file).wrap_err("failed to remap file after grow")? };

        self.page_count = new_page_count;

        Ok(())
    }

    /// Synchronizes the mapping to disk (msync / FlushViewOfFile).
    pub fn sync(&self) -> Result<()> {
        self.mmap.flush().wrap_err("failed to sync mapping to disk")
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn file_size(&self) -> u64 {
        self.page_count as u64 * PAGE_SIZE as u64
    }

    /// Advises the kernel that access to the mapping is predominantly
    /// random, suppressing sequential readahead.
    pub fn advise_random(&self) {
        #[cfg(unix)]
        // SAFETY: madvise is a hint and has no effect on memory safety. The
        // pointer and length cover exactly the live mapping.
        unsafe {
            libc::madvise(
                self.mmap.as_ptr() as *mut libc::c_void,
                self.mmap.len(),
                libc::MADV_RANDOM,
            );
        }
    }

    /// Hints that `count` pages starting at `start_page` will be needed
    /// soon. Out-of-range requests are clamped.
    pub fn prefetch_pages(&self, start_page: u32, count: u32) {
        if start_page >= self.page_count {
            return;
        }

        let end_page = start_page.saturating_add(count).min(self.page_count);
        let start_offset = start_page as usize * PAGE_SIZE;
        let len = (end_page - start_page) as usize * PAGE_SIZE;

        #[cfg(unix)]
        // SAFETY: madvise with MADV_WILLNEED is a hint to the kernel. The
        // range is safe because:
        // 1. start_page was bounds-checked above
        // 2. end_page is clamped to self.page_count, so start_offset + len
        //    never exceeds the mapping
        unsafe {
            libc::madvise(
                self.mmap.as_ptr().add(start_offset) as *mut libc::c_void,
                len,
                libc::MADV_WILLNEED,
            );
        }

        #[cfg(not(unix))]
        let _ = len;
    }
}
