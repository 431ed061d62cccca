//! # Configuration Constants
//!
//! This module centralizes the on-disk format and tuning constants.
//! Constants that depend on each other are co-located and the dependency
//! relationships are spelled out below; the compile-time assertions at the
//! bottom of the file enforce them.
//!
//! ## Dependency Graph
//!
//! ```text
//! PAGE_SIZE (4096 bytes)
//!       │
//!       ├─> LEAF_MAX_KEYS (derived: (PAGE_SIZE - LEAF_HEADER_SIZE) / LEAF_ENTRY_SIZE)
//!       │     A leaf stores its full-capacity key array first, then the
//!       │     value slots. Both regions are sized by LEAF_MAX_KEYS, so the
//!       │     value region offset moves whenever this changes.
//!       │
//!       ├─> INTERIOR_MAX_KEYS (510)
//!       │     510 keys + 511 children at 4 bytes each exactly fill the
//!       │     4084-byte body after the 12-byte interior header.
//!       │
//!       └─> INITIAL_PAGES (8192)
//!             Fresh files are sized to INITIAL_PAGES * PAGE_SIZE = 32 MiB.
//!
//! KEY_SIZE (4) / VALUE_SIZE (100)
//!       │
//!       └─> LEAF_ENTRY_SIZE (derived: KEY_SIZE + VALUE_SIZE)
//! ```
//!
//! ## File Format Anchors
//!
//! - `META_MAGIC` is the first 4 bytes of every valid index file.
//! - `INVALID_PAGE` is the absent-page sentinel used in the metadata root
//!   pointer, the free-list terminator, and the leaf chain ends.
//! - Page `p` begins at byte offset `p * PAGE_SIZE`; page 0 is metadata.
//!
//! ## Modifying Constants
//!
//! Changing any value here changes the on-disk format. Existing index
//! files will be rejected (magic/arithmetic mismatch) or silently
//! misread, so treat every edit as a format revision.

/// Size of every page in bytes. Pages are the unit of allocation, mapping,
/// and node layout.
pub const PAGE_SIZE: usize = 4096;

/// Keys are signed 32-bit integers, compared as such.
pub const KEY_SIZE: usize = 4;

/// Every record value is exactly this many opaque bytes.
pub const VALUE_SIZE: usize = 100;

/// Sentinel page id meaning "no page".
pub const INVALID_PAGE: u32 = 0xFFFF_FFFF;

/// Magic number identifying a valid index file (bytes 0..4 of the file).
pub const META_MAGIC: u32 = 0xB7EE_DB7E;

/// Leaf page header: type byte, 3 padding bytes, num_keys, prev_leaf,
/// next_leaf.
pub const LEAF_HEADER_SIZE: usize = 16;

/// One leaf entry: a key plus its value slot.
pub const LEAF_ENTRY_SIZE: usize = KEY_SIZE + VALUE_SIZE;

/// Maximum entries per leaf.
pub const LEAF_MAX_KEYS: usize = (PAGE_SIZE - LEAF_HEADER_SIZE) / LEAF_ENTRY_SIZE;

/// Byte offset of the key array within a leaf page.
pub const LEAF_KEYS_OFFSET: usize = LEAF_HEADER_SIZE;

/// Byte offset of the value slots within a leaf page. The value region
/// starts after the full-capacity key array, not after the live keys.
pub const LEAF_VALUES_OFFSET: usize = LEAF_HEADER_SIZE + LEAF_MAX_KEYS * KEY_SIZE;

/// Interior page header: type byte, 3 padding bytes, num_keys, parent.
pub const INTERIOR_HEADER_SIZE: usize = 12;

/// Maximum separator keys per interior node (one more child than keys).
pub const INTERIOR_MAX_KEYS: usize = 510;

/// Fresh files are extended to this many pages before the first mapping.
pub const INITIAL_PAGES: u32 = 8192;

/// File capacity doubles on growth until the requirement fits.
pub const GROWTH_FACTOR: u32 = 2;

const _: () = assert!(LEAF_MAX_KEYS == 39);
const _: () = assert!(LEAF_VALUES_OFFSET + LEAF_MAX_KEYS * VALUE_SIZE <= PAGE_SIZE);
const _: () = assert!(
    INTERIOR_HEADER_SIZE + (INTERIOR_MAX_KEYS * 2 + 1) * 4 == PAGE_SIZE,
    "interior body must exactly fit 510 keys and 511 children",
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_capacity_matches_page_arithmetic() {
        assert_eq!(LEAF_MAX_KEYS, (4096 - 16) / 104);
        assert_eq!(LEAF_VALUES_OFFSET, 16 + 39 * 4);
        assert_eq!(LEAF_VALUES_OFFSET + LEAF_MAX_KEYS * VALUE_SIZE, 4072);
    }

    #[test]
    fn interior_body_is_exactly_full() {
        let body = PAGE_SIZE - INTERIOR_HEADER_SIZE;
        assert_eq!(body, INTERIOR_MAX_KEYS * 4 + (INTERIOR_MAX_KEYS + 1) * 4);
    }
}
