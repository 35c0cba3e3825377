//! Buffer pool management for CortenDB.
//!
//! This crate provides the page cache that sits between the B+ tree index
//! and the database file:
//! - Fixed-size buffer pool with configurable frame count
//! - Clock eviction policy with write-back of dirty victims
//! - Pin counting for concurrent access
//! - Single-file disk manager with page-id reuse

mod disk;
mod frame;
mod page_table;
mod pool;
mod replacer;

pub use disk::{DiskManager, DiskManagerConfig};
pub use frame::{BufferFrame, FrameId};
pub use pool::{BufferPoolConfig, BufferPoolManager};
pub use replacer::{ClockReplacer, Replacer};
