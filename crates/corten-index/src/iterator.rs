//! Forward iterator over the leaf sibling chain.

use crate::leaf::LeafNode;
use crate::tree::{PagePin, TreeState};
use bytes::Bytes;
use corten_buffer::BufferPoolManager;
use corten_common::{Result, Rid};
use parking_lot::Mutex;

/// Iterator over (key, RID) pairs in ascending key order.
///
/// Holds exactly one pinned leaf at a time and follows `next_page_id`
/// across the sibling chain, swapping pins as it crosses leaves. The pin
/// is released when the iterator is dropped.
///
/// Each call takes the tree latch, so iteration is a series of independent
/// read operations; a long scan is not a point-in-time snapshot.
pub struct TreeIter<'a> {
    bpm: &'a BufferPoolManager,
    latch: &'a Mutex<TreeState>,
    key_size: usize,
    leaf: Option<PagePin<'a>>,
    index: usize,
}

impl<'a> TreeIter<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        latch: &'a Mutex<TreeState>,
        key_size: usize,
        leaf: Option<PagePin<'a>>,
        index: usize,
    ) -> Self {
        Self {
            bpm,
            latch,
            key_size,
            leaf,
            index,
        }
    }

    /// True once the iterator has moved past the last entry.
    pub fn is_end(&self) -> bool {
        let _latch = self.latch.lock();
        self.is_end_locked()
    }

    fn is_end_locked(&self) -> bool {
        match &self.leaf {
            None => true,
            Some(leaf) => {
                let data = leaf.read();
                let node = LeafNode::attach(&data[..], self.key_size);
                !node.next_page_id().is_valid() && self.index >= node.size()
            }
        }
    }

    /// The (key, RID) pair under the cursor, or None at the end.
    pub fn entry(&self) -> Option<(Bytes, Rid)> {
        let _latch = self.latch.lock();
        let leaf = self.leaf.as_ref()?;
        let data = leaf.read();
        let node = LeafNode::attach(&data[..], self.key_size);
        if self.index >= node.size() {
            return None;
        }
        Some((
            Bytes::copy_from_slice(node.key_at(self.index)),
            node.rid_at(self.index),
        ))
    }

    /// Steps to the next entry, crossing to the right sibling when the
    /// current leaf is exhausted. The old leaf's pin is released as the
    /// new one is taken.
    pub fn advance(&mut self) -> Result<()> {
        let _latch = self.latch.lock();
        let Some(leaf) = self.leaf.as_ref() else {
            return Ok(());
        };

        let (size, next) = {
            let data = leaf.read();
            let node = LeafNode::attach(&data[..], self.key_size);
            (node.size(), node.next_page_id())
        };

        if self.index + 1 >= size && next.is_valid() {
            let next_pin = PagePin::fetch(self.bpm, next)?;
            self.leaf = Some(next_pin);
            self.index = 0;
        } else {
            self.index += 1;
        }
        Ok(())
    }
}

impl<'a> Iterator for TreeIter<'a> {
    type Item = Result<(Bytes, Rid)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_end() {
            return None;
        }
        let entry = self.entry()?;
        if let Err(e) = self.advance() {
            // A failed sibling fetch ends the scan; the error surfaces once.
            self.leaf = None;
            return Some(Err(e));
        }
        Some(Ok(entry))
    }
}
