//! Page identifiers and page-type tags for CortenDB storage.

use serde::{Deserialize, Serialize};

/// Page size in bytes (4 KB).
pub const PAGE_SIZE: usize = 4 * 1024;

/// Unique identifier for a page within the database file.
///
/// Valid page ids are non-negative. `PageId::INVALID` (-1) is the sentinel
/// for "no page"; `PageId::HEADER` (0) is reserved for the header page that
/// records index roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub i64);

impl PageId {
    /// Sentinel for "no page".
    pub const INVALID: PageId = PageId(-1);

    /// The reserved header page.
    pub const HEADER: PageId = PageId(0);

    /// Returns true if this id refers to an actual page.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }

    /// Serializes the id as 8 little-endian bytes.
    #[inline]
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Deserializes an id from 8 little-endian bytes.
    #[inline]
    pub fn from_bytes(buf: [u8; 8]) -> Self {
        PageId(i64::from_le_bytes(buf))
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "page:{}", self.0)
        } else {
            write!(f, "page:invalid")
        }
    }
}

/// Page types in CortenDB storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PageType {
    /// Unallocated/free page.
    Free = 0,
    /// Header page holding (index name, root page id) records.
    Header = 1,
    /// B+ tree leaf page.
    BTreeLeaf = 2,
    /// B+ tree internal page.
    BTreeInternal = 3,
}

impl PageType {
    /// Decodes a page-type tag byte. Unknown tags map to `Free`.
    pub fn from_u8(tag: u8) -> Self {
        match tag {
            1 => PageType::Header,
            2 => PageType::BTreeLeaf,
            3 => PageType::BTreeInternal,
            _ => PageType::Free,
        }
    }
}
