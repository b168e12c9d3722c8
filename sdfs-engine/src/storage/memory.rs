//! In-process store.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ByteSink, ByteSource, ByteStore, PathManipulator, StringStore};
use crate::error::StorageError;

type Blobs = Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>;

/// Thread-safe store that keeps every blob in memory.
///
/// Clones share the same blobs, so one instance can serve as both the
/// policy store's `StringStore` and the engine's `ByteStore`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Blobs,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }

    /// Paths of all stored blobs, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.blobs.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

/// Appends into the blob it was opened on.
struct MemorySink {
    blobs: Blobs,
    path: PathBuf,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.blobs
            .lock()
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl StringStore for MemoryStore {
    fn read(&self, path: &Path) -> Result<Option<String>, StorageError> {
        let Some(bytes) = self.blobs.lock().get(path).cloned() else {
            return Ok(None);
        };
        String::from_utf8(bytes).map(Some).map_err(|e| {
            StorageError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), StorageError> {
        self.blobs
            .lock()
            .insert(path.to_path_buf(), content.as_bytes().to_vec());
        Ok(())
    }
}

impl ByteStore for MemoryStore {
    fn put(&self, path: &Path) -> Result<ByteSink, StorageError> {
        self.blobs.lock().insert(path.to_path_buf(), Vec::new());
        Ok(Box::new(MemorySink {
            blobs: self.blobs.clone(),
            path: path.to_path_buf(),
        }))
    }

    fn get(&self, path: &Path) -> Result<ByteSource, StorageError> {
        self.blobs
            .lock()
            .get(path)
            .cloned()
            .map(|bytes| Box::new(Cursor::new(bytes)) as ByteSource)
            .ok_or_else(|| StorageError::NotFound(path.to_path_buf()))
    }
}

impl PathManipulator for MemoryStore {
    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        Ok(self.blobs.lock().contains_key(path))
    }

    fn rename(&self, source: &Path, target: &Path) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock();
        let bytes = blobs
            .remove(source)
            .ok_or_else(|| StorageError::NotFound(source.to_path_buf()))?;
        blobs.insert(target.to_path_buf(), bytes);
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), StorageError> {
        self.blobs.lock().remove(path);
        Ok(())
    }
}
