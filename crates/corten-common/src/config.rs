//! Configuration structures for CortenDB storage components.

use crate::page::PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration for the buffer pool and disk manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the database file.
    pub db_path: PathBuf,
    /// Page size in bytes.
    pub page_size: usize,
    /// Buffer pool size in number of frames.
    pub buffer_pool_frames: usize,
    /// Enable fsync for durability.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./corten.db"),
            page_size: PAGE_SIZE,
            buffer_pool_frames: 1024,
            fsync_enabled: true,
        }
    }
}

impl StorageConfig {
    /// Returns the total buffer pool size in bytes.
    pub fn buffer_pool_size_bytes(&self) -> usize {
        self.buffer_pool_frames * self.page_size
    }
}

/// Configuration for a single B+ tree index.
///
/// `leaf_max_size` / `internal_max_size` override the fan-out computed from
/// the page layout; tests use tiny values to force splits and merges early.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Fixed key size in bytes.
    pub key_size: usize,
    /// Maximum entries per leaf node (None = derive from page size).
    pub leaf_max_size: Option<u16>,
    /// Maximum entries per internal node (None = derive from page size).
    pub internal_max_size: Option<u16>,
}

impl IndexConfig {
    /// Creates a config for the given key size with derived fan-outs.
    pub fn new(key_size: usize) -> Self {
        Self {
            key_size,
            leaf_max_size: None,
            internal_max_size: None,
        }
    }

    /// Overrides both fan-outs, typically to force small nodes in tests.
    pub fn with_max_sizes(mut self, leaf: u16, internal: u16) -> Self {
        self.leaf_max_size = Some(leaf);
        self.internal_max_size = Some(internal);
        self
    }
}
