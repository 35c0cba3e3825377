//! Lock-free page table for buffer pool page ID to frame ID mapping.

use crate::frame::FrameId;
use corten_common::page::PageId;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Direct array size for low page ids. Covers the first 16384 pages
/// (64 MB at 4 KB pages).
const DIRECT_PATH_SIZE: usize = 16384;

/// Sentinel value for empty slots in direct path.
const EMPTY_FRAME: u32 = u32::MAX;

/// Sentinel value for empty key slots in hash table.
const EMPTY_KEY: u64 = u64::MAX;

/// Sentinel value for deleted key slots (tombstone).
const TOMBSTONE_KEY: u64 = u64::MAX - 1;

/// Lock-free page table mapping PageId to FrameId.
///
/// Uses two-tier lookup:
/// - Direct array for page ids below 16384
/// - Open-addressing hash table with linear probing for the overflow
pub struct PageTable {
    /// Direct array for low page ids. Stores frame_id directly.
    direct_path: Box<[AtomicU32]>,
    /// Hash table keys (page id as u64).
    hash_keys: Box<[AtomicU64]>,
    /// Hash table values (frame_id).
    hash_values: Box<[AtomicU32]>,
    /// Bitmask for hash table indexing (hash_size - 1).
    hash_mask: usize,
}

impl PageTable {
    /// Creates a new page table with capacity for the given number of frames.
    pub fn new(capacity: usize) -> Self {
        // Hash table size = next power of 2, 2x capacity for ~50% load factor
        let hash_size = (capacity * 2).next_power_of_two().max(1024);

        let direct_path: Box<[AtomicU32]> = (0..DIRECT_PATH_SIZE)
            .map(|_| AtomicU32::new(EMPTY_FRAME))
            .collect();

        let hash_keys: Box<[AtomicU64]> = (0..hash_size)
            .map(|_| AtomicU64::new(EMPTY_KEY))
            .collect();

        let hash_values: Box<[AtomicU32]> = (0..hash_size)
            .map(|_| AtomicU32::new(EMPTY_FRAME))
            .collect();

        Self {
            direct_path,
            hash_keys,
            hash_values,
            hash_mask: hash_size - 1,
        }
    }

    #[inline(always)]
    fn is_direct(page_id: PageId) -> bool {
        page_id.0 >= 0 && (page_id.0 as usize) < DIRECT_PATH_SIZE
    }

    /// Looks up a page ID and returns its frame ID if present.
    #[inline(always)]
    pub fn get(&self, page_id: PageId) -> Option<FrameId> {
        if Self::is_direct(page_id) {
            let val = self.direct_path[page_id.0 as usize].load(Ordering::Acquire);
            if val != EMPTY_FRAME {
                return Some(FrameId(val));
            }
            return None;
        }
        self.get_from_hash(page_id)
    }

    #[inline]
    fn get_from_hash(&self, page_id: PageId) -> Option<FrameId> {
        let key = page_id.0 as u64;
        let mut idx = self.hash_index(key);

        for _ in 0..self.hash_keys.len() {
            let stored_key = self.hash_keys[idx].load(Ordering::Acquire);
            if stored_key == EMPTY_KEY {
                return None;
            }
            if stored_key == key {
                let frame_id = self.hash_values[idx].load(Ordering::Acquire);
                return Some(FrameId(frame_id));
            }
            // Skip tombstones and continue probing
            idx = (idx + 1) & self.hash_mask;
        }
        None
    }

    /// Inserts a page ID to frame ID mapping. Returns true on success.
    pub fn insert(&self, page_id: PageId, frame_id: FrameId) -> bool {
        if Self::is_direct(page_id) {
            self.direct_path[page_id.0 as usize].store(frame_id.0, Ordering::Release);
            return true;
        }
        self.insert_to_hash(page_id, frame_id)
    }

    fn insert_to_hash(&self, page_id: PageId, frame_id: FrameId) -> bool {
        let key = page_id.0 as u64;
        let mut idx = self.hash_index(key);

        for _ in 0..self.hash_keys.len() {
            let stored_key = self.hash_keys[idx].load(Ordering::Acquire);
            if stored_key == EMPTY_KEY || stored_key == TOMBSTONE_KEY {
                self.hash_values[idx].store(frame_id.0, Ordering::Release);
                self.hash_keys[idx].store(key, Ordering::Release);
                return true;
            }
            if stored_key == key {
                self.hash_values[idx].store(frame_id.0, Ordering::Release);
                return true;
            }
            idx = (idx + 1) & self.hash_mask;
        }
        false // Table full
    }

    /// Removes a page ID mapping. Returns the frame ID if it was present.
    pub fn remove(&self, page_id: PageId) -> Option<FrameId> {
        if Self::is_direct(page_id) {
            let old = self.direct_path[page_id.0 as usize].swap(EMPTY_FRAME, Ordering::AcqRel);
            if old != EMPTY_FRAME {
                return Some(FrameId(old));
            }
            return None;
        }
        self.remove_from_hash(page_id)
    }

    fn remove_from_hash(&self, page_id: PageId) -> Option<FrameId> {
        let key = page_id.0 as u64;
        let mut idx = self.hash_index(key);

        for _ in 0..self.hash_keys.len() {
            let stored_key = self.hash_keys[idx].load(Ordering::Acquire);
            if stored_key == EMPTY_KEY {
                return None;
            }
            if stored_key == key {
                let frame_id = self.hash_values[idx].load(Ordering::Acquire);
                self.hash_keys[idx].store(TOMBSTONE_KEY, Ordering::Release);
                return Some(FrameId(frame_id));
            }
            idx = (idx + 1) & self.hash_mask;
        }
        None
    }

    /// Computes hash table index for a key.
    #[inline(always)]
    fn hash_index(&self, key: u64) -> usize {
        // FxHash-style multiply for distribution
        let hash = key.wrapping_mul(0x517cc1b727220a95);
        (hash as usize) & self.hash_mask
    }

    /// Returns true if the page ID is in the table.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.get(page_id).is_some()
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        let mut count = 0;
        for slot in self.direct_path.iter() {
            if slot.load(Ordering::Relaxed) != EMPTY_FRAME {
                count += 1;
            }
        }
        for slot in self.hash_keys.iter() {
            let val = slot.load(Ordering::Relaxed);
            if val != EMPTY_KEY && val != TOMBSTONE_KEY {
                count += 1;
            }
        }
        count
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all entries, calling the provided function for each.
    /// Returns early if the function returns false.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(PageId, FrameId) -> bool,
    {
        for (page_num, slot) in self.direct_path.iter().enumerate() {
            let val = slot.load(Ordering::Relaxed);
            if val != EMPTY_FRAME && !f(PageId(page_num as i64), FrameId(val)) {
                return;
            }
        }

        for (idx, key_slot) in self.hash_keys.iter().enumerate() {
            let key = key_slot.load(Ordering::Relaxed);
            if key != EMPTY_KEY && key != TOMBSTONE_KEY {
                let frame_id = self.hash_values[idx].load(Ordering::Relaxed);
                if !f(PageId(key as i64), FrameId(frame_id)) {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_path_insert_get() {
        let table = PageTable::new(100);
        let page_id = PageId(42);
        let frame_id = FrameId(7);

        assert!(table.insert(page_id, frame_id));
        assert_eq!(table.get(page_id), Some(frame_id));
        assert!(table.contains(page_id));
    }

    #[test]
    fn test_direct_path_remove() {
        let table = PageTable::new(100);
        let page_id = PageId(42);
        let frame_id = FrameId(7);

        table.insert(page_id, frame_id);
        assert_eq!(table.remove(page_id), Some(frame_id));
        assert_eq!(table.get(page_id), None);
        assert!(!table.contains(page_id));
    }

    #[test]
    fn test_high_page_id_uses_hash() {
        let table = PageTable::new(100);
        let page_id = PageId(DIRECT_PATH_SIZE as i64 + 100);
        let frame_id = FrameId(5);

        assert!(table.insert(page_id, frame_id));
        assert_eq!(table.get(page_id), Some(frame_id));
        assert_eq!(table.remove(page_id), Some(frame_id));
        assert_eq!(table.get(page_id), None);
    }

    #[test]
    fn test_len() {
        let table = PageTable::new(100);

        assert_eq!(table.len(), 0);
        assert!(table.is_empty());

        table.insert(PageId(1), FrameId(1));
        table.insert(PageId(2), FrameId(2));
        table.insert(PageId(20000), FrameId(3));

        assert_eq!(table.len(), 3);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_update_existing() {
        let table = PageTable::new(100);
        let page_id = PageId(42);

        table.insert(page_id, FrameId(1));
        assert_eq!(table.get(page_id), Some(FrameId(1)));

        table.insert(page_id, FrameId(2));
        assert_eq!(table.get(page_id), Some(FrameId(2)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_for_each_visits_all() {
        let table = PageTable::new(100);
        table.insert(PageId(1), FrameId(1));
        table.insert(PageId(30000), FrameId(2));

        let mut seen = Vec::new();
        table.for_each(|pid, fid| {
            seen.push((pid, fid));
            true
        });
        seen.sort_by_key(|(pid, _)| pid.0);

        assert_eq!(seen, vec![(PageId(1), FrameId(1)), (PageId(30000), FrameId(2))]);
    }
}
