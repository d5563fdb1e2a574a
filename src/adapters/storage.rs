//! Config document storage.
//!
//! - [`FileStorage`] — the real backend, a single file on the mounted data
//!   partition (LittleFS on device, any path on the host).
//! - [`MemStorage`] — in-memory backend for host tests and simulation, with
//!   write counting and fault injection.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use log::debug;

use crate::app::ports::StoragePort;
use crate::error::StorageError;

/// Default location of the config document on the device's data partition.
pub const CONFIG_PATH: &str = "/data/config.json";

/// Filesystem-backed storage for the config document.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StoragePort for FileStorage {
    fn read(&mut self) -> Result<Vec<u8>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                debug!("read {} bytes from {}", bytes.len(), self.path.display());
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(_) => Err(StorageError::ReadFailed),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        fs::write(&self.path, data).map_err(|_| StorageError::WriteFailed)
    }

    fn remove(&mut self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(_) => Err(StorageError::WriteFailed),
        }
    }
}

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct MemStorage {
    content: Option<Vec<u8>>,
    write_count: u32,
    fail_writes: bool,
}

impl MemStorage {
    /// No document present (first boot).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_content(content: Vec<u8>) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }

    pub fn content(&self) -> Option<Vec<u8>> {
        self.content.clone()
    }

    pub fn write_count(&self) -> u32 {
        self.write_count
    }

    /// Make every subsequent write fail until turned off again.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl StoragePort for MemStorage {
    fn read(&mut self) -> Result<Vec<u8>, StorageError> {
        self.content.clone().ok_or(StorageError::NotFound)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::WriteFailed);
        }
        self.content = Some(data.to_vec());
        self.write_count += 1;
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StorageError> {
        self.content = None;
        Ok(())
    }
}
