//! Storage Module.
//!
//! File-system access for the persisted configuration and imported key files.

pub mod raw_files;

use core::fmt;

/// Errors related to storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// File not found.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// IO error (generic).
    IoError,
    /// File exceeds the size accepted for its purpose.
    TooLarge,
    /// Invalid path or filename.
    InvalidPath,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound => write!(f, "file not found"),
            StorageError::PermissionDenied => write!(f, "permission denied"),
            StorageError::IoError => write!(f, "I/O error"),
            StorageError::TooLarge => write!(f, "file too large"),
            StorageError::InvalidPath => write!(f, "invalid path"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied,
            _ => StorageError::IoError,
        }
    }
}
