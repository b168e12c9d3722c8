//! # SDFS
//!
//! Convenience crate that re-exports the SDFS access engine with the default
//! document policy store, and opens a filesystem-backed engine from
//! configuration.
//!
//! For custom policy stores or storage backends, depend on `sdfs-engine`
//! directly.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::io::{Read, Write};
//! use sdfs::{Cn, ResourceName, SdfsConfig};
//!
//! let config = SdfsConfig::parse(r#"
//!     [store]
//!     root = "/var/lib/sdfs"
//! "#).expect("Failed to parse config");
//!
//! let engine = sdfs::open(&config).expect("Failed to open store");
//! let alice = Cn::new("alice");
//! let report: ResourceName = "report.pdf".parse().expect("Failed to parse resource name");
//!
//! // The first writer of a resource becomes its owner
//! let put = engine.put(&alice, &report).expect("Failed to lock for writing");
//! put.content_sink().expect("sink").write_all(b"contents").expect("write");
//! put.meta_sink().expect("sink").write_all(b"meta").expect("write");
//! put.release().expect("Failed to publish");
//!
//! // Read it back
//! let get = engine.get(&alice, &report).expect("Failed to lock for reading");
//! let mut bytes = Vec::new();
//! get.content().expect("source").read_to_end(&mut bytes).expect("read");
//! get.release();
//! ```

use tracing::info;

// Re-export everything from the engine crate
pub use sdfs_engine::*;

// Re-export the default policy store and configuration
pub use sdfs_policy::{
    ConfigError, DelegationDenied, DocumentPolicyStore, Policy, PrincipalRights, SdfsConfig,
    StoreConfig,
};

/// An engine over a directory tree, with policies kept beside the resources.
pub type FileEngine = ResourceAccessEngine<DocumentPolicyStore<FileStore, SystemClock>, FileStore>;

/// Open a filesystem-backed engine as described by `config`.
///
/// The store root is created if it does not exist.
pub fn open(config: &SdfsConfig) -> Result<FileEngine, EngineError> {
    let store = FileStore::new(&config.store.root)?;
    let policy = DocumentPolicyStore::new(store.clone(), SystemClock);
    info!(root = %store.root().display(), "opened file store");
    Ok(ResourceAccessEngine::new(policy, store))
}
