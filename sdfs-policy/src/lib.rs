//! # SDFS Policy
//!
//! Default policy backend for the SDFS access engine.
//!
//! Provides the delegation rights algebra (owners, direct and redelegatable
//! rights, lifetime caps), a `PolicyStore` that persists one TOML policy
//! document per resource, and TOML configuration for file-backed stores.

mod config;
mod policy;
mod store;

pub use config::{ConfigError, SdfsConfig, StoreConfig};
pub use policy::{DelegationDenied, Policy, PrincipalRights};
pub use store::DocumentPolicyStore;
