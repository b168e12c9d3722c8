//! Error types for the access engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Action, Cn, InvalidResourceName, ResourceName};

/// Errors from the access engine and its policy store.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The principal lacks the right the action requires.
    #[error("access denied: {principal} may not {action} '{resource}'")]
    AccessDenied {
        principal: Cn,
        resource: ResourceName,
        action: Action,
    },

    /// The resource has never been successfully put.
    #[error("resource '{resource}' does not exist")]
    ResourceNonexistent { resource: ResourceName },

    /// The resource is locked by another session; try again later.
    #[error("resource '{resource}' is unavailable: {reason}")]
    ResourceUnavailable {
        resource: ResourceName,
        reason: Unavailability,
    },

    /// A requested name cannot identify a resource.
    #[error(transparent)]
    InvalidName(#[from] InvalidResourceName),

    /// The persisted policy document could not be read or written.
    #[error("policy error: {0}")]
    Policy(String),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Whether the caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ResourceUnavailable { .. })
    }
}

/// Why a resource could not be locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailability {
    BeingWritten,
    BeingRead,
}

impl std::fmt::Display for Unavailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unavailability::BeingWritten => f.write_str("currently being written"),
            Unavailability::BeingRead => f.write_str("currently being read"),
        }
    }
}

/// Errors from the string and byte stores.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no blob stored at {0}")]
    NotFound(PathBuf),

    /// Absolute paths and `..` components are refused.
    #[error("path {0} escapes the store root")]
    InvalidPath(PathBuf),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
