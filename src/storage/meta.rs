//! # Metadata Page Header
//!
//! Page 0 of every index file starts with this 20-byte header; the rest of
//! the page is zero padding. The header is the root of trust for the whole
//! file: the magic identifies the format, and the remaining fields anchor
//! the tree root, the allocation watermark, the free list, and the live
//! record count.
//!
//! ## Layout (all fields little-endian u32)
//!
//! ```text
//! Offset  Field           Description
//! ------  --------------  ------------------------------------------
//! 0       magic           0xB7EEDB7E for a valid index file
//! 4       root_page_id    tree root, INVALID_PAGE when empty
//! 8       num_pages       pages ever allocated (watermark, >= 1)
//! 12      free_list_head  first free page, INVALID_PAGE when none
//! 16      num_records     live records across all leaves
//! ```
//!
//! Unlike tree pages, the metadata page carries no type byte; it is
//! identified purely by living at file offset 0 (byte 0 happens to hold
//! the low byte of the magic).
//!
//! `from_bytes` / `from_bytes_mut` validate the magic on every access, so
//! a corrupt or foreign file is rejected the first time any operation
//! touches its metadata.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{INVALID_PAGE, META_MAGIC};

pub const META_HEADER_SIZE: usize = 20;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct MetaHeader {
    magic: U32,
    root_page_id: U32,
    num_pages: U32,
    free_list_head: U32,
    num_records: U32,
}

const _: () = assert!(std::mem::size_of::<MetaHeader>() == META_HEADER_SIZE);

impl MetaHeader {
    pub fn new() -> Self {
        Self {
            magic: U32::new(META_MAGIC),
            root_page_id: U32::new(INVALID_PAGE),
            num_pages: U32::new(1),
            free_list_head: U32::new(INVALID_PAGE),
            num_records: U32::new(0),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= META_HEADER_SIZE,
            "buffer too small for MetaHeader: {} < {}",
            bytes.len(),
            META_HEADER_SIZE
        );

        let header = Self::ref_from_bytes(&bytes[..META_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse MetaHeader: {:?}", e))?;

        ensure!(
            header.magic.get() == META_MAGIC,
            "invalid magic {:#010x} in metadata page (expected {:#010x})",
            header.magic.get(),
            META_MAGIC
        );

        Ok(header)
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            bytes.len() >= META_HEADER_SIZE,
            "buffer too small for MetaHeader: {} < {}",
            bytes.len(),
            META_HEADER_SIZE
        );

        let header = Self::mut_from_bytes(&mut bytes[..META_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse MetaHeader: {:?}", e))?;

        ensure!(
            header.magic.get() == META_MAGIC,
            "invalid magic {:#010x} in metadata page (expected {:#010x})",
            header.magic.get(),
            META_MAGIC
        );

        Ok(header)
    }

    pub fn magic(&self) -> u32 {
        self.magic.get()
    }

    zerocopy_accessors! {
        root_page_id: u32,
        num_pages: u32,
        free_list_head: u32,
        num_records: u32,
    }
}

impl Default for MetaHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_20() {
        assert_eq!(std::mem::size_of::<MetaHeader>(), 20);
    }

    #[test]
    fn new_header_defaults() {
        let header = MetaHeader::new();

        assert_eq!(header.magic(), META_MAGIC);
        assert_eq!(header.root_page_id(), INVALID_PAGE);
        assert_eq!(header.num_pages(), 1);
        assert_eq!(header.free_list_head(), INVALID_PAGE);
        assert_eq!(header.num_records(), 0);
    }

    #[test]
    fn header_roundtrip() {
        let mut header = MetaHeader::new();
        header.set_root_page_id(7);
        header.set_num_pages(42);
        header.set_free_list_head(13);
        header.set_num_records(1000);

        let bytes = header.as_bytes();
        let parsed = MetaHeader::from_bytes(bytes).unwrap();

        assert_eq!(parsed.root_page_id(), 7);
        assert_eq!(parsed.num_pages(), 42);
        assert_eq!(parsed.free_list_head(), 13);
        assert_eq!(parsed.num_records(), 1000);
    }

    #[test]
    fn on_disk_field_offsets_are_fixed() {
        let mut header = MetaHeader::new();
        header.set_root_page_id(0x01020304);
        header.set_num_pages(0x0A0B0C0D);

        let bytes = header.as_bytes();
        assert_eq!(&bytes[0..4], &0xB7EE_DB7Eu32.to_le_bytes());
        assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[8..12], &[0x0D, 0x0C, 0x0B, 0x0A]);
    }

    #[test]
    fn rejects_invalid_magic() {
        let bytes = [0u8; 64];
        let result = MetaHeader::from_bytes(&bytes);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("invalid magic"));
    }

    #[test]
    fn rejects_short_buffer() {
        let bytes = [0u8; 8];
        assert!(MetaHeader::from_bytes(&bytes).is_err());
    }
}
