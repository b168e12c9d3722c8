//! Storage collaborators used by the engine and the policy store.
//!
//! The engine never touches disk directly. It depends on three narrow
//! contracts, all addressed by store-relative paths:
//!
//! - [`StringStore`] persists small text documents (policies)
//! - [`ByteStore`] streams resource content and metadata
//! - [`PathManipulator`] checks, moves and deletes blobs
//!
//! [`FileStore`] implements all three over a directory tree and
//! [`MemoryStore`] implements them in process.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::StorageError;

mod fs;
mod memory;

pub use fs::FileStore;
pub use memory::MemoryStore;

/// Writable stream of bytes for one blob.
pub type ByteSink = Box<dyn Write + Send>;

/// Readable stream of bytes for one blob.
pub type ByteSource = Box<dyn Read + Send>;

/// Whole-document text persistence.
pub trait StringStore: Send + Sync {
    /// Read the document at `path`, or `None` if nothing is stored there.
    fn read(&self, path: &Path) -> Result<Option<String>, StorageError>;

    /// Replace the document at `path`.
    fn write(&self, path: &Path, content: &str) -> Result<(), StorageError>;
}

/// Streaming blob persistence.
pub trait ByteStore: Send + Sync {
    /// Open a sink that replaces the blob at `path`.
    fn put(&self, path: &Path) -> Result<ByteSink, StorageError>;

    /// Open a source over the blob at `path`.
    fn get(&self, path: &Path) -> Result<ByteSource, StorageError>;
}

/// Blob-level namespace operations.
pub trait PathManipulator: Send + Sync {
    fn exists(&self, path: &Path) -> Result<bool, StorageError>;

    /// Move `source` to `target`, replacing whatever is at `target`.
    fn rename(&self, source: &Path, target: &Path) -> Result<(), StorageError>;

    /// Delete the blob at `path`. Deleting a missing blob succeeds.
    fn delete(&self, path: &Path) -> Result<(), StorageError>;
}
