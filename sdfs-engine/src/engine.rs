//! The resource access engine: admission control, locking and delegation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{EngineError, Unavailability};
use crate::handle::{Get, Put};
use crate::lock::LockTable;
use crate::storage::{ByteStore, PathManipulator};
use crate::types::{AccessType, Action, Cn, LockState, PolicyStore, ResourceName, Right};

/// The single entry point for resource access.
///
/// For every resource the engine tracks in-flight readers and at most one
/// writer, asks the `PolicyStore` whether a principal may proceed, and hands
/// out [`Get`] / [`Put`] handles that unlock the resource when finished.
///
/// All admission decisions, for every resource, run under one engine-wide
/// mutex together with the policy lookups they trigger. Byte transfer through
/// the returned handles happens outside it.
///
/// The engine is generic over a `PolicyStore` implementation and over the
/// store that holds resource bytes.
pub struct ResourceAccessEngine<P: PolicyStore, S: ByteStore + PathManipulator> {
    policy: P,
    store: Arc<S>,
    locks: Arc<LockTable>,
}

impl<P: PolicyStore, S: ByteStore + PathManipulator> ResourceAccessEngine<P, S> {
    /// Create an engine over a policy store and a byte store.
    pub fn new(policy: P, store: S) -> Self {
        Self {
            policy,
            store: Arc::new(store),
            locks: Arc::new(LockTable::default()),
        }
    }

    /// Get a reference to the policy store.
    pub fn policy_store(&self) -> &P {
        &self.policy
    }

    /// Get a reference to the byte store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Open a resource for reading.
    ///
    /// The engine:
    /// 1. Refuses if the resource is being written
    /// 2. Refuses if the resource has never been published
    /// 3. Refuses if the principal may not get it
    /// 4. Otherwise records a new reader and returns its handle
    ///
    /// A refused request leaves no trace in the lock table.
    pub fn get(&self, cn: &Cn, resource: &ResourceName) -> Result<Get<S>, EngineError> {
        let mut locks = self.locks.lock();

        if locks.get(resource).is_some_and(|lock| lock.put.is_some()) {
            debug!(principal = %cn, resource = %resource, "get refused: being written");
            return Err(EngineError::ResourceUnavailable {
                resource: resource.clone(),
                reason: Unavailability::BeingWritten,
            });
        }

        if !self.exists(resource)? {
            return Err(EngineError::ResourceNonexistent {
                resource: resource.clone(),
            });
        }

        if !self.policy.has_access(cn, resource, AccessType::Get)? {
            warn!(principal = %cn, resource = %resource, "get denied");
            return Err(EngineError::AccessDenied {
                principal: cn.clone(),
                resource: resource.clone(),
                action: Action::Access(AccessType::Get),
            });
        }

        let id = self.locks.next_id();
        locks.entry(resource.clone()).or_default().gets.insert(id);
        debug!(principal = %cn, resource = %resource, handle = id, "get admitted");

        Ok(Get::new(
            self.store.clone(),
            self.locks.clone(),
            resource.clone(),
            cn.clone(),
            id,
        ))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Open a resource for writing.
    ///
    /// The engine:
    /// 1. Refuses if the resource is being written or read
    /// 2. Makes the principal owner if the resource has never been published
    /// 3. Refuses if the principal may not put it
    /// 4. Otherwise records the writer and returns its handle
    pub fn put(&self, cn: &Cn, resource: &ResourceName) -> Result<Put<S>, EngineError> {
        let mut locks = self.locks.lock();

        if let Some(lock) = locks.get(resource) {
            let reason = if lock.put.is_some() {
                Unavailability::BeingWritten
            } else {
                Unavailability::BeingRead
            };
            debug!(principal = %cn, resource = %resource, "put refused: {reason}");
            return Err(EngineError::ResourceUnavailable {
                resource: resource.clone(),
                reason,
            });
        }

        if !self.exists(resource)? {
            self.policy.grant_owner(cn, resource)?;
            info!(principal = %cn, resource = %resource, "first writer granted ownership");
        }

        if !self.policy.has_access(cn, resource, AccessType::Put)? {
            warn!(principal = %cn, resource = %resource, "put denied");
            return Err(EngineError::AccessDenied {
                principal: cn.clone(),
                resource: resource.clone(),
                action: Action::Access(AccessType::Put),
            });
        }

        let id = self.locks.next_id();
        locks.entry(resource.clone()).or_default().put = Some(id);
        debug!(principal = %cn, resource = %resource, handle = id, "put admitted");

        Ok(Put::new(
            self.store.clone(),
            self.locks.clone(),
            resource.clone(),
            cn.clone(),
            id,
        ))
    }

    // =========================================================================
    // Delegation
    // =========================================================================

    /// Grant `right` on an existing resource from one principal to another.
    ///
    /// Delegation does not need the resource to be idle; it only serializes
    /// with other decisions. The granted lifetime never exceeds the
    /// delegator's own.
    pub fn delegate(
        &self,
        from: &Cn,
        to: &Cn,
        resource: &ResourceName,
        right: Right,
        expiration: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let _decision = self.locks.lock();

        if !self.exists(resource)? {
            return Err(EngineError::ResourceNonexistent {
                resource: resource.clone(),
            });
        }

        self.policy.delegate(from, to, resource, right, expiration)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Current lock occupancy of a resource.
    pub fn lock_state(&self, resource: &ResourceName) -> LockState {
        self.locks.state(resource)
    }

    /// Whether a resource has been published.
    ///
    /// Metadata is published last, so its presence marks a complete resource.
    pub fn exists(&self, resource: &ResourceName) -> Result<bool, EngineError> {
        Ok(self.store.exists(&resource.meta_path())?)
    }
}

impl<P: PolicyStore, S: ByteStore + PathManipulator> std::fmt::Debug
    for ResourceAccessEngine<P, S>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceAccessEngine")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}
