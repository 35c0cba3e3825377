//! Error types for CortenDB.

use thiserror::Error;

/// Result type alias using CortenError.
pub type Result<T> = std::result::Result<T, CortenError>;

/// Errors that can occur in CortenDB storage operations.
#[derive(Debug, Error)]
pub enum CortenError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Buffer pool errors
    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: i64 },

    #[error("Buffer pool full, unable to allocate frame")]
    BufferPoolFull,

    #[error("Page size mismatch: expected {expected}, got {actual}")]
    PageSizeMismatch { expected: usize, actual: usize },

    // B+ tree errors
    #[error("Key size mismatch: expected {expected} bytes, got {actual}")]
    KeySizeMismatch { expected: usize, actual: usize },

    #[error("Invalid node type on page {page_id}")]
    InvalidNodeType { page_id: i64 },

    #[error("B+ tree corrupted: {0}")]
    TreeCorrupted(String),

    #[error("Header page full, cannot register index")]
    HeaderFull,

    #[error("Index name too long: {0} bytes (max {1})")]
    IndexNameTooLong(usize, usize),

    // Configuration errors
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },
}
