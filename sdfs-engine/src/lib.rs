//! # SDFS Access Engine
//!
//! Core access-control and locking engine for the secure distributed file store.
//!
//! This crate provides:
//! - Principal, resource and rights types (`Cn`, `ResourceName`, `Right`)
//! - `PolicyStore` trait for pluggable, persisted authorization decisions
//! - Storage contracts (`StringStore`, `ByteStore`, `PathManipulator`) with
//!   filesystem and in-memory implementations
//! - `ResourceAccessEngine` that serializes admission, tracks readers and
//!   writers per resource, and hands out `Get` / `Put` session handles

pub mod clock;
pub mod engine;
pub mod error;
pub mod handle;
mod lock;
pub mod storage;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::ResourceAccessEngine;
pub use error::{EngineError, StorageError, Unavailability};
pub use handle::{Get, Put};
pub use storage::{
    ByteSink, ByteSource, ByteStore, FileStore, MemoryStore, PathManipulator, StringStore,
};
pub use types::{
    AccessType, Action, Cn, DelegationType, InvalidResourceName, LockState, ParseRightError,
    PolicyStore, ResourceName, Right,
};

// Re-export the instant type used for expirations
pub use chrono::{DateTime, Utc};
