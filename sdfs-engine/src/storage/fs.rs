//! Directory-backed store.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{ByteSink, ByteSource, ByteStore, PathManipulator, StringStore};
use crate::error::StorageError;

/// Store rooted at a directory on the local filesystem.
///
/// Every path handed to the store is resolved beneath `root`. Paths that are
/// absolute or contain `..` are rejected, so a resource name can never reach
/// outside the store.
///
/// Text documents are written atomically (write to a hidden temp file, then
/// rename). Parent directories are created on demand.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, StorageError> {
        let mut resolved = self.root.clone();
        let mut depth = 0;
        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::InvalidPath(path.to_path_buf()));
                }
            }
        }
        if depth == 0 {
            return Err(StorageError::InvalidPath(path.to_path_buf()));
        }
        Ok(resolved)
    }

    fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        match path.parent() {
            Some(parent) => fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e)),
            None => Ok(()),
        }
    }

    fn temp_sibling(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.tmp"))
    }
}

impl StringStore for FileStore {
    fn read(&self, path: &Path) -> Result<Option<String>, StorageError> {
        let full = self.resolve(path)?;
        match fs::read_to_string(&full) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(full, e)),
        }
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        Self::ensure_parent(&full)?;

        let temp = Self::temp_sibling(&full);
        fs::write(&temp, content).map_err(|e| StorageError::io(&temp, e))?;
        fs::rename(&temp, &full).map_err(|e| StorageError::io(&full, e))
    }
}

impl ByteStore for FileStore {
    fn put(&self, path: &Path) -> Result<ByteSink, StorageError> {
        let full = self.resolve(path)?;
        Self::ensure_parent(&full)?;
        let file = File::create(&full).map_err(|e| StorageError::io(&full, e))?;
        Ok(Box::new(file))
    }

    fn get(&self, path: &Path) -> Result<ByteSource, StorageError> {
        let full = self.resolve(path)?;
        match File::open(&full) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(StorageError::io(full, e)),
        }
    }
}

impl PathManipulator for FileStore {
    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        let full = self.resolve(path)?;
        full.try_exists().map_err(|e| StorageError::io(&full, e))
    }

    fn rename(&self, source: &Path, target: &Path) -> Result<(), StorageError> {
        let from = self.resolve(source)?;
        let to = self.resolve(target)?;
        Self::ensure_parent(&to)?;
        fs::rename(&from, &to).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(source.to_path_buf()),
            _ => StorageError::io(from, e),
        })
    }

    fn delete(&self, path: &Path) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(full, e)),
        }
    }
}
