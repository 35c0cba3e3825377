//! B+ tree internal page operations.

use crate::comparator::KeyComparator;
use crate::node::{self, NodeHeader};
use corten_buffer::BufferPoolManager;
use corten_common::page::{PageId, PageType};
use corten_common::{CortenError, Result};

/// Offset of the first slot.
pub(crate) const INTERNAL_SLOTS_OFFSET: usize = NodeHeader::SIZE;

/// View over an internal page's bytes.
///
/// Layout:
/// ```text
/// +----------------------+ 0
/// | NodeHeader           |
/// +----------------------+ 32
/// | slot 0: key | child  |   slot 0's key bytes are padding
/// | slot 1: key | child  |   slots 1.. hold separator keys
/// | ...                  |
/// +----------------------+
/// ```
///
/// Separator K_i (i >= 1) is a lower bound for the subtree at child i and
/// strictly greater than every key under child i-1. Like the leaf layout,
/// one extra overflow slot beyond `max_size` is reserved.
pub struct InternalNode<B> {
    data: B,
    key_size: usize,
}

impl<B: AsRef<[u8]>> InternalNode<B> {
    /// Wraps a page buffer.
    pub fn attach(data: B, key_size: usize) -> Self {
        Self { data, key_size }
    }

    #[inline]
    fn slot_size(&self) -> usize {
        self.key_size + 8
    }

    #[inline]
    fn slot_offset(&self, index: usize) -> usize {
        INTERNAL_SLOTS_OFFSET + index * self.slot_size()
    }

    /// Decodes the node header.
    pub fn header(&self) -> NodeHeader {
        NodeHeader::from_bytes(self.data.as_ref())
    }

    /// Current slot count (= child count).
    #[inline]
    pub fn size(&self) -> usize {
        node::size_of(self.data.as_ref())
    }

    /// Slot capacity.
    pub fn max_size(&self) -> usize {
        self.header().max_size as usize
    }

    /// Minimum slot count for a non-root internal node.
    pub fn min_size(&self) -> usize {
        self.header().min_size() as usize
    }

    /// This page's id.
    pub fn page_id(&self) -> PageId {
        self.header().page_id
    }

    /// Parent page id, or `PageId::INVALID` at the root.
    pub fn parent_page_id(&self) -> PageId {
        self.header().parent_page_id
    }

    /// Separator key bytes at the given slot (slot 0 is padding).
    pub fn key_at(&self, index: usize) -> &[u8] {
        let off = self.slot_offset(index);
        &self.data.as_ref()[off..off + self.key_size]
    }

    /// Child page id at the given slot.
    pub fn value_at(&self, index: usize) -> PageId {
        let off = self.slot_offset(index) + self.key_size;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.data.as_ref()[off..off + 8]);
        PageId::from_bytes(buf)
    }

    /// Index of the slot holding `child`, or None.
    pub fn value_index(&self, child: PageId) -> Option<usize> {
        (0..self.size()).find(|&i| self.value_at(i) == child)
    }

    /// Routing lookup: the child whose subtree may contain `key`.
    ///
    /// Binary search for the last separator <= key in slots 1..size-1;
    /// child 0 when every separator is greater.
    pub fn lookup<C: KeyComparator>(&self, key: &[u8], cmp: &C) -> PageId {
        debug_assert!(self.size() > 1);
        let mut st: isize = 1;
        let mut ed: isize = self.size() as isize - 1;
        while st <= ed {
            let mid = st + (ed - st) / 2;
            if cmp.compare(self.key_at(mid as usize), key).is_le() {
                st = mid + 1;
            } else {
                ed = mid - 1;
            }
        }
        self.value_at((st - 1) as usize)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> InternalNode<B> {
    /// Initializes a zeroed page as an empty internal node.
    pub fn init(&mut self, page_id: PageId, parent_page_id: PageId, max_size: u16) {
        let header = NodeHeader {
            page_type: PageType::BTreeInternal,
            size: 0,
            max_size,
            page_id,
            parent_page_id,
            lsn: 0,
        };
        self.data.as_mut()[..NodeHeader::SIZE].copy_from_slice(&header.to_bytes());
    }

    #[inline]
    fn set_size(&mut self, size: usize) {
        node::set_size_of(self.data.as_mut(), size as u16);
    }

    /// Updates the parent pointer.
    pub fn set_parent_page_id(&mut self, parent: PageId) {
        node::set_parent_page_id(self.data.as_mut(), parent);
    }

    /// Overwrites the separator key at the given slot.
    pub fn set_key_at(&mut self, index: usize, key: &[u8]) {
        let off = self.slot_offset(index);
        let key_size = self.key_size;
        self.data.as_mut()[off..off + key_size].copy_from_slice(key);
    }

    fn set_value_at(&mut self, index: usize, child: PageId) {
        let off = self.slot_offset(index) + self.key_size;
        self.data.as_mut()[off..off + 8].copy_from_slice(&child.to_bytes());
    }

    fn shift_right(&mut self, from: usize) {
        let size = self.size();
        if from < size {
            let start = self.slot_offset(from);
            let end = self.slot_offset(size);
            let slot = self.slot_size();
            self.data.as_mut().copy_within(start..end, start + slot);
        }
    }

    fn shift_left(&mut self, from: usize) {
        let size = self.size();
        if from + 1 < size {
            let start = self.slot_offset(from + 1);
            let end = self.slot_offset(size);
            let slot = self.slot_size();
            self.data.as_mut().copy_within(start..end, start - slot);
        }
    }

    /// Seeds a fresh root after the old root split: slot 0 keeps only the
    /// left child, slot 1 holds the separator and the right child.
    pub fn populate_new_root(&mut self, left_child: PageId, key: &[u8], right_child: PageId) {
        self.set_value_at(0, left_child);
        self.set_key_at(1, key);
        self.set_value_at(1, right_child);
        self.set_size(2);
    }

    /// Inserts (key, new_child) directly after the slot holding `old_child`.
    /// Returns the new size.
    pub fn insert_node_after(
        &mut self,
        old_child: PageId,
        key: &[u8],
        new_child: PageId,
    ) -> Result<usize> {
        let idx = self.value_index(old_child).ok_or_else(|| {
            CortenError::TreeCorrupted(format!(
                "child {} not found in internal page {}",
                old_child.0,
                self.page_id().0
            ))
        })? + 1;

        self.shift_right(idx);
        self.set_key_at(idx, key);
        self.set_value_at(idx, new_child);
        let new_size = self.size() + 1;
        self.set_size(new_size);
        Ok(new_size)
    }

    /// Removes the slot at the given index.
    pub fn remove(&mut self, index: usize) {
        self.shift_left(index);
        let new_size = self.size() - 1;
        self.set_size(new_size);
    }

    /// Collapses a degenerate root: returns its only child and empties the
    /// node.
    pub fn remove_and_return_only_child(&mut self) -> PageId {
        let child = self.value_at(0);
        self.set_size(0);
        child
    }

    /// Splits an over-full internal node, moving the slots from `min_size`
    /// upward into `recipient` and re-parenting the moved children.
    ///
    /// `recipient.key_at(0)` afterwards holds the separator the caller
    /// pushes up into the parent.
    pub fn move_half_to<B2: AsRef<[u8]> + AsMut<[u8]>>(
        &mut self,
        recipient: &mut InternalNode<B2>,
        bpm: &BufferPoolManager,
    ) -> Result<()> {
        let total = self.size();
        let split_at = self.min_size();
        let moved = total - split_at;

        let src_start = self.slot_offset(split_at);
        let src_end = self.slot_offset(total);
        let dst_start = recipient.slot_offset(0);
        recipient.data.as_mut()[dst_start..dst_start + (src_end - src_start)]
            .copy_from_slice(&self.data.as_ref()[src_start..src_end]);

        self.set_size(split_at);
        recipient.set_size(moved);

        let new_parent = recipient.page_id();
        for i in 0..moved {
            reparent_child(bpm, recipient.value_at(i), new_parent)?;
        }
        Ok(())
    }

    /// Merges every slot of `self` into the left sibling `recipient`.
    ///
    /// `middle_key` (the parent separator between the two nodes) fills
    /// slot 0's padding so the merged sequence stays well formed; moved
    /// children are re-parented. `self` ends up empty.
    pub fn move_all_to<B2: AsRef<[u8]> + AsMut<[u8]>>(
        &mut self,
        recipient: &mut InternalNode<B2>,
        middle_key: &[u8],
        bpm: &BufferPoolManager,
    ) -> Result<()> {
        self.set_key_at(0, middle_key);

        let moving = self.size();
        let dst = recipient.size();

        let src_start = self.slot_offset(0);
        let src_end = self.slot_offset(moving);
        let dst_start = recipient.slot_offset(dst);
        recipient.data.as_mut()[dst_start..dst_start + (src_end - src_start)]
            .copy_from_slice(&self.data.as_ref()[src_start..src_end]);

        recipient.set_size(dst + moving);
        self.set_size(0);

        let new_parent = recipient.page_id();
        for i in dst..dst + moving {
            reparent_child(bpm, recipient.value_at(i), new_parent)?;
        }
        Ok(())
    }

    /// Moves this node's first slot to the tail of the left sibling
    /// `recipient`, pulling `middle_key` down into the moved slot. The
    /// caller promotes this node's new first key into the parent.
    pub fn move_first_to_end_of<B2: AsRef<[u8]> + AsMut<[u8]>>(
        &mut self,
        recipient: &mut InternalNode<B2>,
        middle_key: &[u8],
        bpm: &BufferPoolManager,
    ) -> Result<()> {
        self.set_key_at(0, middle_key);

        let slot = self.slot_size();
        let dst = recipient.size();
        let src = self.slot_offset(0);
        let dst_off = recipient.slot_offset(dst);
        recipient.data.as_mut()[dst_off..dst_off + slot]
            .copy_from_slice(&self.data.as_ref()[src..src + slot]);
        recipient.set_size(dst + 1);

        self.shift_left(0);
        let new_size = self.size() - 1;
        self.set_size(new_size);

        reparent_child(bpm, recipient.value_at(dst), recipient.page_id())
    }

    /// Moves this node's last slot to the front of the right sibling
    /// `recipient`, pushing `middle_key` down into the displaced slot. The
    /// caller promotes the moved slot's key into the parent.
    pub fn move_last_to_front_of<B2: AsRef<[u8]> + AsMut<[u8]>>(
        &mut self,
        recipient: &mut InternalNode<B2>,
        middle_key: &[u8],
        bpm: &BufferPoolManager,
    ) -> Result<()> {
        let last = self.size() - 1;
        let slot = self.slot_size();
        let src = self.slot_offset(last);

        recipient.set_key_at(0, middle_key);
        recipient.shift_right(0);
        let dst = recipient.slot_offset(0);
        recipient.data.as_mut()[dst..dst + slot]
            .copy_from_slice(&self.data.as_ref()[src..src + slot]);
        let recipient_size = recipient.size() + 1;
        recipient.set_size(recipient_size);

        self.set_size(last);

        reparent_child(bpm, recipient.value_at(0), recipient.page_id())
    }
}

/// Fetches `child`, rewrites its parent pointer, and unpins it dirty.
fn reparent_child(bpm: &BufferPoolManager, child: PageId, parent: PageId) -> Result<()> {
    let frame = bpm.fetch_page(child)?;
    {
        let mut data = frame.write_data();
        node::set_parent_page_id(&mut data[..], parent);
    }
    bpm.unpin_page(child, true);
    Ok(())
}
