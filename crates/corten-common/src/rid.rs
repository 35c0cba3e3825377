//! Record identifiers.

use crate::page::PageId;
use serde::{Deserialize, Serialize};

/// Identifies a tuple in a heap table: the page it lives on and its slot
/// within that page.
///
/// The index layer treats RIDs as opaque fixed-size values with equality;
/// only the heap side ever dereferences them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rid {
    /// The heap page holding the tuple.
    pub page_id: PageId,
    /// Slot number within the page.
    pub slot: u32,
}

impl Rid {
    /// On-disk size: page_id (8) + slot (4).
    pub const SIZE: usize = 12;

    /// Creates a new RID.
    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }

    /// Serializes to 12 little-endian bytes.
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..8].copy_from_slice(&self.page_id.to_bytes());
        buf[8..12].copy_from_slice(&self.slot.to_le_bytes());
        buf
    }

    /// Deserializes from 12 little-endian bytes.
    pub fn from_bytes(buf: &[u8]) -> Self {
        let mut page = [0u8; 8];
        page.copy_from_slice(&buf[0..8]);
        Self {
            page_id: PageId::from_bytes(page),
            slot: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
        }
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.page_id, self.slot)
    }
}
