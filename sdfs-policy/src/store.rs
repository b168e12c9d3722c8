//! Policy store persisting one TOML document per resource.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sdfs_engine::{
    AccessType, Action, Clock, Cn, EngineError, PolicyStore, ResourceName, Right, StringStore,
};
use tracing::{debug, info, warn};

use crate::policy::Policy;

/// `PolicyStore` backed by a `StringStore`.
///
/// Each resource's policy lives at `<resource>/policy`. A missing document is
/// the empty policy. Every call loads the document, decides or transforms,
/// and for mutations writes the whole document back, all under one mutex so
/// direct callers get the same atomicity as the engine.
pub struct DocumentPolicyStore<S: StringStore, C: Clock> {
    store: S,
    clock: C,
    section: Mutex<()>,
}

impl<S: StringStore, C: Clock> DocumentPolicyStore<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            section: Mutex::new(()),
        }
    }

    /// Get a reference to the clock used for expiration checks.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Load the current policy of a resource (for introspection and audit).
    pub fn policy(&self, resource: &ResourceName) -> Result<Policy, EngineError> {
        let _section = self.section.lock();
        self.load(resource)
    }

    fn load(&self, resource: &ResourceName) -> Result<Policy, EngineError> {
        let document = self
            .store
            .read(&resource.policy_path())?
            .unwrap_or_default();
        Policy::parse(&document).map_err(|e| {
            EngineError::Policy(format!("failed to parse policy of '{resource}': {e}"))
        })
    }

    fn save(&self, resource: &ResourceName, policy: &Policy) -> Result<(), EngineError> {
        let document = policy.render().map_err(|e| {
            EngineError::Policy(format!("failed to render policy of '{resource}': {e}"))
        })?;
        self.store.write(&resource.policy_path(), &document)?;
        Ok(())
    }
}

impl<S: StringStore, C: Clock> PolicyStore for DocumentPolicyStore<S, C> {
    fn has_access(
        &self,
        cn: &Cn,
        resource: &ResourceName,
        access: AccessType,
    ) -> Result<bool, EngineError> {
        let _section = self.section.lock();
        let now = self.clock.now();
        let allowed = self.load(resource)?.principal_rights(cn).may_do(access, now);
        debug!(principal = %cn, resource = %resource, %access, allowed, "access check");
        Ok(allowed)
    }

    fn is_owner(&self, cn: &Cn, resource: &ResourceName) -> Result<bool, EngineError> {
        let _section = self.section.lock();
        Ok(self.load(resource)?.principal_rights(cn).is_owner())
    }

    fn grant_owner(&self, cn: &Cn, resource: &ResourceName) -> Result<(), EngineError> {
        let _section = self.section.lock();
        let policy = self.load(resource)?.grant_owner(cn);
        self.save(resource, &policy)?;
        info!(principal = %cn, resource = %resource, "owner granted");
        Ok(())
    }

    fn delegate(
        &self,
        from: &Cn,
        to: &Cn,
        resource: &ResourceName,
        right: Right,
        expiration: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let _section = self.section.lock();
        let now = self.clock.now();

        let policy = match self.load(resource)?.delegate(from, to, right, expiration, now) {
            Ok(policy) => policy,
            Err(denied) => {
                warn!(resource = %resource, "delegation refused: {denied}");
                return Err(EngineError::AccessDenied {
                    principal: from.clone(),
                    resource: resource.clone(),
                    action: Action::Delegate(right),
                });
            }
        };

        self.save(resource, &policy)?;
        info!(
            from = %from,
            to = %to,
            resource = %resource,
            %right,
            "right delegated"
        );
        Ok(())
    }
}
