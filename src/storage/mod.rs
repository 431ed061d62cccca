//! # Storage Layer
//!
//! The storage layer owns the single backing file and exposes it as an
//! array of 4096-byte pages through a read-write shared memory mapping.
//!
//! ## Components
//!
//! - [`MmapStorage`]: the mapping itself — create/open, bounds-checked
//!   page windows, grow-and-remap, sync, madvise hints.
//! - [`MetaHeader`]: the typed view of page 0 (magic, tree root,
//!   allocation watermark, free-list head, record count).
//! - [`Pager`]: page lifecycle on top of both — open-or-create, free-list
//!   allocate/free, demand growth with capacity doubling.
//!
//! ## Safety Model
//!
//! Growing the file replaces the mapping, which invalidates every
//! outstanding page reference. All growth paths take `&mut self`, so the
//! borrow checker rejects code that holds a page view across a call that
//! can allocate. Higher layers therefore structure each operation as:
//! read what they need from a page, drop the view, allocate, re-fetch.
//!
//! Durability follows the mmap model: mutations are visible to subsequent
//! reads in-process immediately, and reach disk on [`Pager::sync`] (or
//! when the kernel writes back dirty pages on its own schedule).

mod meta;
mod mmap;
mod pager;

pub use meta::{MetaHeader, META_HEADER_SIZE};
pub use mmap::MmapStorage;
pub use pager::Pager;
