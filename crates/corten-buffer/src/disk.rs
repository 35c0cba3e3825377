//! Disk manager for page-level file I/O.

use corten_common::config::StorageConfig;
use corten_common::page::{PageId, PAGE_SIZE};
use corten_common::{CortenError, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Configuration for the disk manager.
#[derive(Debug, Clone)]
pub struct DiskManagerConfig {
    /// Path of the database file.
    pub db_path: PathBuf,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
}

impl Default for DiskManagerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./corten.db"),
            fsync_enabled: true,
        }
    }
}

impl From<&StorageConfig> for DiskManagerConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            db_path: config.db_path.clone(),
            fsync_enabled: config.fsync_enabled,
        }
    }
}

/// Manages reading and writing pages to the database file.
///
/// All pages share a single id space; a page's file offset is
/// `page_id * PAGE_SIZE`. Deallocated page ids are kept in an in-memory
/// free list and handed out again before the file is extended.
pub struct DiskManager {
    /// Configuration.
    config: DiskManagerConfig,
    /// Open file handle and allocation state.
    inner: Mutex<DiskInner>,
}

struct DiskInner {
    /// The database file.
    file: File,
    /// Number of pages in the file.
    num_pages: i64,
    /// Deallocated page ids available for reuse.
    free_pages: Vec<PageId>,
}

impl DiskManager {
    /// Opens or creates the database file.
    pub fn new(config: DiskManagerConfig) -> Result<Self> {
        if let Some(dir) = config.db_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&config.db_path)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as i64;

        Ok(Self {
            config,
            inner: Mutex::new(DiskInner {
                file,
                num_pages,
                free_pages: Vec::new(),
            }),
        })
    }

    /// Returns the database file path.
    pub fn db_path(&self) -> &Path {
        &self.config.db_path
    }

    /// Reads a page from disk.
    pub fn read_page(&self, page_id: PageId) -> Result<[u8; PAGE_SIZE]> {
        let mut inner = self.inner.lock();

        if !page_id.is_valid() || page_id.0 >= inner.num_pages {
            return Err(CortenError::PageNotFound { page_id: page_id.0 });
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;

        let mut buffer = [0u8; PAGE_SIZE];
        inner.file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    /// Writes a page to disk.
    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        let mut inner = self.inner.lock();

        if !page_id.is_valid() {
            return Err(CortenError::PageNotFound { page_id: page_id.0 });
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(data)?;

        if self.config.fsync_enabled {
            inner.file.sync_all()?;
        }

        if page_id.0 >= inner.num_pages {
            inner.num_pages = page_id.0 + 1;
        }

        Ok(())
    }

    /// Allocates a page id, reusing a deallocated one if available.
    ///
    /// Newly extended pages are zero-filled on disk.
    pub fn allocate_page(&self) -> Result<PageId> {
        let mut inner = self.inner.lock();

        if let Some(page_id) = inner.free_pages.pop() {
            return Ok(page_id);
        }

        let page_id = PageId(inner.num_pages);
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(&[0u8; PAGE_SIZE])?;

        if self.config.fsync_enabled {
            inner.file.sync_all()?;
        }

        inner.num_pages = page_id.0 + 1;

        Ok(page_id)
    }

    /// Returns a page id to the free list for reuse.
    ///
    /// The free list is in-memory only; ids not reused before shutdown
    /// remain allocated in the file.
    pub fn deallocate_page(&self, page_id: PageId) {
        if page_id.is_valid() {
            self.inner.lock().free_pages.push(page_id);
        }
    }

    /// Returns the number of pages in the file.
    pub fn num_pages(&self) -> i64 {
        self.inner.lock().num_pages
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().file.sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.inner.lock().file.sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_disk_manager() -> (DiskManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = DiskManagerConfig {
            db_path: dir.path().join("test.db"),
            fsync_enabled: false,
        };
        let dm = DiskManager::new(config).unwrap();
        (dm, dir)
    }

    #[test]
    fn test_disk_manager_new() {
        let (dm, _dir) = create_test_disk_manager();
        assert!(dm.db_path().exists());
        assert_eq!(dm.num_pages(), 0);
    }

    #[test]
    fn test_disk_manager_allocate_page() {
        let (dm, _dir) = create_test_disk_manager();

        assert_eq!(dm.allocate_page().unwrap(), PageId(0));
        assert_eq!(dm.allocate_page().unwrap(), PageId(1));
        assert_eq!(dm.num_pages(), 2);
    }

    #[test]
    fn test_disk_manager_write_read() {
        let (dm, _dir) = create_test_disk_manager();

        let page_id = dm.allocate_page().unwrap();

        let mut data = [0u8; PAGE_SIZE];
        data[0] = 0xAB;
        data[100] = 0xCD;
        data[PAGE_SIZE - 1] = 0xEF;
        dm.write_page(page_id, &data).unwrap();

        let read_data = dm.read_page(page_id).unwrap();
        assert_eq!(read_data[0], 0xAB);
        assert_eq!(read_data[100], 0xCD);
        assert_eq!(read_data[PAGE_SIZE - 1], 0xEF);
    }

    #[test]
    fn test_disk_manager_read_nonexistent_page() {
        let (dm, _dir) = create_test_disk_manager();

        dm.allocate_page().unwrap();

        assert!(dm.read_page(PageId(99)).is_err());
        assert!(dm.read_page(PageId::INVALID).is_err());
    }

    #[test]
    fn test_disk_manager_allocate_reuses_freed_pages() {
        let (dm, _dir) = create_test_disk_manager();

        let p0 = dm.allocate_page().unwrap();
        let p1 = dm.allocate_page().unwrap();
        assert_ne!(p0, p1);

        dm.deallocate_page(p1);
        assert_eq!(dm.allocate_page().unwrap(), p1);
        assert_eq!(dm.num_pages(), 2);
    }

    #[test]
    fn test_disk_manager_new_pages_are_zeroed() {
        let (dm, _dir) = create_test_disk_manager();

        let page_id = dm.allocate_page().unwrap();
        let data = dm.read_page(page_id).unwrap();
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_disk_manager_overwrite_page() {
        let (dm, _dir) = create_test_disk_manager();

        let page_id = dm.allocate_page().unwrap();

        let mut data1 = [0u8; PAGE_SIZE];
        data1[0] = 0xAA;
        dm.write_page(page_id, &data1).unwrap();

        let mut data2 = [0u8; PAGE_SIZE];
        data2[0] = 0xBB;
        dm.write_page(page_id, &data2).unwrap();

        assert_eq!(dm.read_page(page_id).unwrap()[0], 0xBB);
    }

    #[test]
    fn test_disk_manager_persistence() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("persist.db");
        let page_id;

        {
            let config = DiskManagerConfig {
                db_path: db_path.clone(),
                fsync_enabled: true,
            };
            let dm = DiskManager::new(config).unwrap();
            page_id = dm.allocate_page().unwrap();

            let mut data = [0u8; PAGE_SIZE];
            data[0] = 0xFF;
            dm.write_page(page_id, &data).unwrap();
        }

        {
            let config = DiskManagerConfig {
                db_path,
                fsync_enabled: true,
            };
            let dm = DiskManager::new(config).unwrap();
            assert_eq!(dm.num_pages(), 1);
            assert_eq!(dm.read_page(page_id).unwrap()[0], 0xFF);
        }
    }

    #[test]
    fn test_disk_manager_config_from_storage_config() {
        let storage = StorageConfig {
            db_path: PathBuf::from("/tmp/x.db"),
            fsync_enabled: false,
            ..Default::default()
        };
        let config = DiskManagerConfig::from(&storage);
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert!(!config.fsync_enabled);
    }
}
