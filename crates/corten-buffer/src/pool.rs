//! Buffer pool manager.

use crate::disk::{DiskManager, DiskManagerConfig};
use crate::frame::{BufferFrame, FrameId};
use crate::page_table::PageTable;
use crate::replacer::{ClockReplacer, Replacer};
use corten_common::config::StorageConfig;
use corten_common::page::PageId;
use corten_common::{CortenError, Result};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub num_frames: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

/// Buffer pool manager.
///
/// Manages a fixed-size pool of page frames backed by the disk manager:
/// - Page ID to frame ID mapping (lock-free page table)
/// - Free frame list for newly cached pages
/// - Clock replacement with write-back of dirty victims
/// - Pin counting for concurrent access
///
/// The contract consumed by the index layer: every `fetch_page`/`new_page`
/// pins the returned frame and must be paired with exactly one
/// `unpin_page`; `delete_page` succeeds only once the pin count is zero.
pub struct BufferPoolManager {
    /// Configuration.
    config: BufferPoolConfig,
    /// Array of buffer frames.
    frames: Vec<BufferFrame>,
    /// Page ID to frame ID mapping (lock-free reads).
    page_table: PageTable,
    /// List of free frame IDs.
    free_list: Mutex<Vec<FrameId>>,
    /// Page replacement policy.
    replacer: ClockReplacer,
    /// Backing storage.
    disk: DiskManager,
    /// Serializes frame allocation, page creation, and page deletion.
    alloc_latch: Mutex<()>,
}

impl BufferPoolManager {
    /// Creates a new buffer pool over the given disk manager.
    ///
    /// The header page (page 0) is allocated on first use of a fresh file
    /// so that `fetch_page(PageId::HEADER)` always succeeds.
    pub fn new(config: BufferPoolConfig, disk: DiskManager) -> Result<Self> {
        let num_frames = config.num_frames;

        let frames: Vec<_> = (0..num_frames)
            .map(|i| BufferFrame::new(FrameId(i as u32)))
            .collect();

        let free_list: Vec<_> = (0..num_frames).map(|i| FrameId(i as u32)).collect();

        if disk.num_pages() == 0 {
            let header = disk.allocate_page()?;
            debug_assert_eq!(header, PageId::HEADER);
        }

        Ok(Self {
            config,
            frames,
            page_table: PageTable::new(num_frames),
            free_list: Mutex::new(free_list),
            replacer: ClockReplacer::new(num_frames),
            disk,
            alloc_latch: Mutex::new(()),
        })
    }

    /// Opens a buffer pool from storage configuration.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let disk = DiskManager::new(DiskManagerConfig::from(config))?;
        Self::new(
            BufferPoolConfig {
                num_frames: config.buffer_pool_frames,
            },
            disk,
        )
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.num_frames
    }

    /// Returns the number of free frames.
    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Returns the number of frames currently pinned.
    pub fn pinned_frame_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_pinned()).count()
    }

    /// Checks if a page is cached in the buffer pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.contains(page_id)
    }

    /// Fetches a page, reading it from disk if it is not cached.
    ///
    /// The returned frame is pinned; the caller must pair this with exactly
    /// one `unpin_page`. Fails with `BufferPoolFull` when every frame is
    /// pinned and no victim can be selected.
    pub fn fetch_page(&self, page_id: PageId) -> Result<&BufferFrame> {
        if !page_id.is_valid() {
            return Err(CortenError::PageNotFound { page_id: page_id.0 });
        }

        // Fast path: cached page
        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            frame.pin();
            self.replacer.record_access(frame_id);
            return Ok(frame);
        }

        let _guard = self.alloc_latch.lock();

        // Re-check under the latch: another thread may have loaded it.
        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            frame.pin();
            self.replacer.record_access(frame_id);
            return Ok(frame);
        }

        trace!(page_id = page_id.0, "buffer pool miss");

        let frame_id = self.allocate_frame()?;
        let frame = &self.frames[frame_id.0 as usize];

        match self.disk.read_page(page_id) {
            Ok(data) => frame.copy_from(&data),
            Err(e) => {
                // Put the frame back before surfacing the error
                frame.reset();
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        }

        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();
        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);

        Ok(frame)
    }

    /// Allocates a fresh page id and a zeroed, pinned frame for it.
    pub fn new_page(&self) -> Result<(PageId, &BufferFrame)> {
        let _guard = self.alloc_latch.lock();

        let frame_id = self.allocate_frame()?;
        let frame = &self.frames[frame_id.0 as usize];

        let page_id = match self.disk.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                frame.reset();
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        frame.reset();
        frame.set_page_id(page_id);
        frame.pin();
        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);

        Ok((page_id, frame))
    }

    /// Unpins a page, optionally marking it dirty.
    ///
    /// Returns false if the page is not cached or was not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];

            if frame.pin_count() == 0 {
                return false;
            }
            if is_dirty {
                frame.set_dirty(true);
            }
            frame.unpin();
            return true;
        }
        false
    }

    /// Deletes a page, returning its id to the disk manager's free list.
    ///
    /// Returns false if the page is still pinned. Deleting a page that is
    /// not cached only releases the id.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let _guard = self.alloc_latch.lock();

        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];

            if frame.is_pinned() {
                return false;
            }

            self.page_table.remove(page_id);
            self.replacer.remove(frame_id);
            frame.reset();
            self.free_list.lock().push(frame_id);
        }

        self.disk.deallocate_page(page_id);
        true
    }

    /// Flushes a page to disk if it is cached and dirty.
    ///
    /// Returns true if the page was written.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];

            if frame.is_dirty() {
                let data = frame.read_data();
                self.disk.write_page(page_id, &data)?;
                drop(data);
                frame.set_dirty(false);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Flushes all dirty pages. Returns the number of pages written.
    pub fn flush_all(&self) -> Result<usize> {
        let mut dirty_pages = Vec::new();
        self.page_table.for_each(|page_id, frame_id| {
            if self.frames[frame_id.0 as usize].is_dirty() {
                dirty_pages.push(page_id);
            }
            true
        });

        let mut flushed = 0;
        for page_id in dirty_pages {
            if self.flush_page(page_id)? {
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    /// Allocates a frame from the free list, evicting a victim if needed.
    ///
    /// Must be called with `alloc_latch` held. A dirty victim is written
    /// back before its frame is reused.
    fn allocate_frame(&self) -> Result<FrameId> {
        {
            let mut free_list = self.free_list.lock();
            if let Some(frame_id) = free_list.pop() {
                return Ok(frame_id);
            }
        }

        let victim_id = self.replacer.evict(&|fid| {
            let frame = &self.frames[fid.0 as usize];
            !frame.is_empty() && frame.pin_count() == 0
        });

        let Some(victim_id) = victim_id else {
            return Err(CortenError::BufferPoolFull);
        };

        let frame = &self.frames[victim_id.0 as usize];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            debug!(page_id = old_page_id.0, "evicting dirty page, writing back");
            let data = frame.read_data();
            self.disk.write_page(old_page_id, &data)?;
        }

        self.page_table.remove(old_page_id);
        frame.reset();

        Ok(victim_id)
    }
}
