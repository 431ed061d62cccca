//! # BurrowDB — Memory-Mapped B+ Tree Index
//!
//! BurrowDB is a single-file, embedded B+ tree index mapping signed
//! 32-bit keys to fixed 100-byte opaque values. It is built for random
//! point lookups and sequential range iteration over a memory-mapped
//! page store:
//!
//! - **Zero-copy reads**: point reads and range scans return slices
//!   pointing straight into the mapping, no intermediate buffers
//! - **Single-writer simplicity**: no locks, no transactions — program
//!   order is the ordering model, and callers provide exclusion
//! - **Persistent by mapping**: mutations land in the OS page cache and
//!   reach disk on an explicit flush
//!
//! ## Quick Start
//!
//! ```ignore
//! use burrowdb::BPlusTree;
//!
//! let mut tree = BPlusTree::open("./records.idx")?;
//!
//! tree.write(42, &[0u8; 100])?;
//! if let Some(value) = tree.read(42)? {
//!     println!("{} bytes", value.len());
//! }
//! for value in tree.range(0, 100)? {
//!     // values arrive in ascending key order
//! }
//! tree.flush()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Public API (BPlusTree)           │
//! ├─────────────────────────────────────┤
//! │  Tree Engine (descent/split/scan)    │
//! ├─────────────────────────────────────┤
//! │  Node Formats (leaf / interior)      │
//! ├─────────────────────────────────────┤
//! │  Pager (free list, growth, meta)     │
//! ├─────────────────────────────────────┤
//! │  Memory-Mapped File I/O              │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! One file, an array of 4096-byte pages:
//!
//! ```text
//! Page 0:   metadata (magic, root id, watermark, free list, records)
//! Page 1+:  leaf and interior nodes, discriminated by their first byte,
//!           plus free pages threaded through the free list
//! ```
//!
//! Fresh files are sized to 32 MiB up front and double as they fill.
//!
//! ## Module Overview
//!
//! - [`storage`]: memory-mapped page store, metadata header, pager
//! - [`btree`]: node formats, tree engine, range scan, integrity check
//! - [`config`]: on-disk format and tuning constants

#[macro_use]
mod macros;

pub mod btree;
pub mod config;
pub mod storage;

pub use btree::{BPlusTree, RangeScan};
pub use config::{INVALID_PAGE, KEY_SIZE, PAGE_SIZE, VALUE_SIZE};
pub use storage::{MmapStorage, Pager};
