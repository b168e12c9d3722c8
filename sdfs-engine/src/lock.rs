//! In-memory per-resource locks.
//!
//! A resource with no entry is idle. An entry holds either any number of
//! reader ids or exactly one writer id, never both. Entries are removed as
//! soon as they become empty, so the table only ever holds resources with an
//! in-flight operation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::types::{LockState, ResourceName};

/// Identifies one outstanding `Get` or `Put` handle.
pub(crate) type HandleId = u64;

#[derive(Debug, Default)]
pub(crate) struct Lock {
    pub(crate) gets: HashSet<HandleId>,
    pub(crate) put: Option<HandleId>,
}

impl Lock {
    fn is_empty(&self) -> bool {
        self.gets.is_empty() && self.put.is_none()
    }

    fn state(&self) -> LockState {
        match (self.put, self.gets.len()) {
            (Some(_), _) => LockState::Writing,
            (None, 0) => LockState::Idle,
            (None, n) => LockState::Reading(n),
        }
    }
}

pub(crate) type Locks = HashMap<ResourceName, Lock>;

/// Engine-wide lock table.
///
/// The mutex around the table doubles as the engine's decision section:
/// admission checks hold it for their whole duration, including the policy
/// lookups they trigger.
#[derive(Debug, Default)]
pub(crate) struct LockTable {
    locks: Mutex<Locks>,
    next_id: AtomicU64,
}

impl LockTable {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Locks> {
        self.locks.lock()
    }

    pub(crate) fn next_id(&self) -> HandleId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn state(&self, resource: &ResourceName) -> LockState {
        self.locks
            .lock()
            .get(resource)
            .map(Lock::state)
            .unwrap_or(LockState::Idle)
    }

    pub(crate) fn release_get(&self, resource: &ResourceName, id: HandleId) {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get_mut(resource) {
            lock.gets.remove(&id);
            if lock.is_empty() {
                locks.remove(resource);
            }
        }
    }

    pub(crate) fn release_put(&self, resource: &ResourceName, id: HandleId) {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get_mut(resource) {
            if lock.put == Some(id) {
                lock.put = None;
            }
            if lock.is_empty() {
                locks.remove(resource);
            }
        }
    }
}
