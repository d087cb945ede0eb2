//! Raw File Storage.
//!
//! Provides basic file system operations with security checks.
//!
//! # Security
//! - Ensures files are written atomically (write-sync-rename).
//! - Creates files owner-readable only on Unix; the configuration holds key material.

use super::StorageError;

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

/// Largest file `read_file` accepts. Configurations and libotr key files are tiny.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Opens `path` for writing with owner-only permissions where supported.
pub fn create_private(path: &Path, append: bool) -> Result<File, StorageError> {
    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    Ok(options.open(path)?)
}

/// Writes data to a file atomically.
pub fn write_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<(), StorageError> {
    let path = path.as_ref();
    let filename = path.file_name().ok_or(StorageError::InvalidPath)?;
    let mut temp_path = path.to_path_buf();
    temp_path.set_file_name(format!("{}.tmp", filename.to_string_lossy()));

    let mut file = create_private(&temp_path, false)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    // Rename to final path (atomic on POSIX)
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    Ok(())
}

/// Reads data from a file, refusing anything over `MAX_FILE_SIZE`.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, StorageError> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len > MAX_FILE_SIZE {
        return Err(StorageError::TooLarge);
    }

    let mut buffer = Vec::with_capacity(len as usize);
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}
