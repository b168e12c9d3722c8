//! Session handles returned by the engine.
//!
//! A [`Get`] reads the published content and metadata of a resource. A
//! [`Put`] writes into staging paths and publishes them on `release`. Both
//! hold the resource's lock until they are finished, either explicitly or by
//! being dropped.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::lock::{HandleId, LockTable};
use crate::storage::{ByteSink, ByteSource, ByteStore, PathManipulator};
use crate::types::{Cn, ResourceName};

/// An admitted read of one resource.
///
/// Dropping a `Get` releases it.
pub struct Get<S: ByteStore + PathManipulator> {
    store: Arc<S>,
    locks: Arc<LockTable>,
    resource: ResourceName,
    principal: Cn,
    id: HandleId,
    released: bool,
}

impl<S: ByteStore + PathManipulator> Get<S> {
    pub(crate) fn new(
        store: Arc<S>,
        locks: Arc<LockTable>,
        resource: ResourceName,
        principal: Cn,
        id: HandleId,
    ) -> Self {
        Self {
            store,
            locks,
            resource,
            principal,
            id,
            released: false,
        }
    }

    pub fn resource(&self) -> &ResourceName {
        &self.resource
    }

    pub fn principal(&self) -> &Cn {
        &self.principal
    }

    /// Open the published content.
    pub fn content(&self) -> Result<ByteSource, EngineError> {
        Ok(self.store.get(&self.resource.content_path())?)
    }

    /// Open the published metadata.
    pub fn meta(&self) -> Result<ByteSource, EngineError> {
        Ok(self.store.get(&self.resource.meta_path())?)
    }

    /// Finish reading and give up the resource's read lock.
    pub fn release(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.locks.release_get(&self.resource, self.id);
        debug!(principal = %self.principal, resource = %self.resource, "get released");
    }
}

impl<S: ByteStore + PathManipulator> Drop for Get<S> {
    fn drop(&mut self) {
        if !self.released {
            warn!(resource = %self.resource, "get dropped without release");
            self.finish();
        }
    }
}

impl<S: ByteStore + PathManipulator> std::fmt::Debug for Get<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Get")
            .field("resource", &self.resource)
            .field("principal", &self.principal)
            .field("id", &self.id)
            .finish()
    }
}

/// An admitted write of one resource.
///
/// Bytes go to staging paths. Nothing is visible to readers until
/// [`Put::release`] publishes them; [`Put::abort`] discards them. Dropping a
/// `Put` without finishing it aborts it.
pub struct Put<S: ByteStore + PathManipulator> {
    store: Arc<S>,
    locks: Arc<LockTable>,
    resource: ResourceName,
    principal: Cn,
    id: HandleId,
    finished: bool,
}

impl<S: ByteStore + PathManipulator> Put<S> {
    pub(crate) fn new(
        store: Arc<S>,
        locks: Arc<LockTable>,
        resource: ResourceName,
        principal: Cn,
        id: HandleId,
    ) -> Self {
        Self {
            store,
            locks,
            resource,
            principal,
            id,
            finished: false,
        }
    }

    pub fn resource(&self) -> &ResourceName {
        &self.resource
    }

    pub fn principal(&self) -> &Cn {
        &self.principal
    }

    /// Open a sink for the new content.
    pub fn content_sink(&self) -> Result<ByteSink, EngineError> {
        Ok(self.store.put(&self.resource.staged_content_path())?)
    }

    /// Open a sink for the new metadata.
    pub fn meta_sink(&self) -> Result<ByteSink, EngineError> {
        Ok(self.store.put(&self.resource.staged_meta_path())?)
    }

    /// Publish the staged content and metadata, then unlock the resource.
    ///
    /// Content is moved before metadata. A resource only exists once its
    /// metadata is published, so a failure between the two moves never
    /// exposes a new resource without metadata. The resource is unlocked
    /// whether or not publishing succeeds; on failure whatever is still
    /// staged is discarded.
    pub fn release(mut self) -> Result<(), EngineError> {
        self.finished = true;

        let published = self.publish();
        if let Err(e) = &published {
            warn!(resource = %self.resource, "publish failed, discarding staged blobs: {e}");
            if let Err(e) = self.discard_staged() {
                warn!(resource = %self.resource, "failed to discard staged blobs: {e}");
            }
        } else {
            info!(principal = %self.principal, resource = %self.resource, "put published");
        }

        self.locks.release_put(&self.resource, self.id);
        published
    }

    /// Discard the staged content and metadata, then unlock the resource.
    ///
    /// Previously published content is left untouched.
    pub fn abort(mut self) -> Result<(), EngineError> {
        self.finish_aborted()
    }

    fn publish(&self) -> Result<(), EngineError> {
        self.store.rename(
            &self.resource.staged_content_path(),
            &self.resource.content_path(),
        )?;
        self.store
            .rename(&self.resource.staged_meta_path(), &self.resource.meta_path())?;
        Ok(())
    }

    /// Both deletes are attempted; the first failure is reported.
    fn discard_staged(&self) -> Result<(), EngineError> {
        let content = self.store.delete(&self.resource.staged_content_path());
        let meta = self.store.delete(&self.resource.staged_meta_path());
        content?;
        meta?;
        Ok(())
    }

    fn finish_aborted(&mut self) -> Result<(), EngineError> {
        self.finished = true;
        let discarded = self.discard_staged();
        self.locks.release_put(&self.resource, self.id);
        warn!(principal = %self.principal, resource = %self.resource, "put aborted");
        discarded
    }
}

impl<S: ByteStore + PathManipulator> Drop for Put<S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(resource = %self.resource, "put dropped without release or abort");
        if let Err(e) = self.finish_aborted() {
            warn!(resource = %self.resource, "abort on drop failed: {e}");
        }
    }
}

impl<S: ByteStore + PathManipulator> std::fmt::Debug for Put<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Put")
            .field("resource", &self.resource)
            .field("principal", &self.principal)
            .field("id", &self.id)
            .finish()
    }
}
