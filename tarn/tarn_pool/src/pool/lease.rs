//! The guard through which a caller holds an acquired resource.

use super::bounded::Shared;
use super::resource::Resource;
use crate::id::ResourceId;
use log::warn;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Weak;
use std::time::{Duration, Instant};

/// A handle to a resource from the pool
///
/// The resource is exclusively owned by the lease until it is released,
/// either explicitly with [`crate::Pool::release`] or by dropping the lease.
/// If the pool is gone by then, the resource is closed instead.
pub struct Lease<R: Resource> {
    /// Identity of the leased resource
    id: ResourceId,

    /// The resource itself, `None` once handed back or detached
    resource: Option<R>,

    /// Reference to the pool this resource belongs to
    pool: Weak<Shared<R>>,

    /// When this resource was acquired
    acquired_at: Instant,
}

impl<R: Resource> Lease<R> {
    pub(crate) fn new(id: ResourceId, resource: R, pool: Weak<Shared<R>>) -> Self {
        Self {
            id,
            resource: Some(resource),
            pool,
            acquired_at: Instant::now(),
        }
    }

    /// Identity of the leased resource
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Get a reference to the resource
    pub fn get(&self) -> &R {
        self.resource.as_ref().expect("Resource missing")
    }

    /// Get a mutable reference to the resource
    pub fn get_mut(&mut self) -> &mut R {
        self.resource.as_mut().expect("Resource missing")
    }

    /// Get the time since this resource was acquired
    pub fn held_duration(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Take the resource out of the lease without returning it.
    ///
    /// The pool keeps counting the resource as outstanding until the
    /// [`Detached`] token comes back through [`crate::Pool::restore`]. A
    /// detached resource that is never restored stays outstanding for good.
    pub fn detach(mut self) -> Detached<R> {
        let resource = self.resource.take().expect("Resource missing");
        Detached::new(self.id, resource)
    }

    pub(crate) fn take(&mut self) -> Option<R> {
        self.resource.take()
    }
}

impl<R: Resource> Deref for Lease<R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.get()
    }
}

impl<R: Resource> DerefMut for Lease<R> {
    fn deref_mut(&mut self) -> &mut R {
        self.get_mut()
    }
}

impl<R: Resource + fmt::Debug> fmt::Debug for Lease<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .finish()
    }
}

/// A resource taken out of its [`Lease`], owed back to the pool
///
/// Only [`Lease::detach`] hands these out, so a token always carries a
/// resource the pool really issued under that id. It is neither `Clone`
/// nor `Copy`; restoring it consumes it.
///
/// ```compile_fail
/// use tarn_pool::{Detached, PoolId, ResourceId};
///
/// // Resource ids cannot be made up outside the pool.
/// let id = ResourceId::new(PoolId::new(), 0);
/// ```
pub struct Detached<R> {
    id: ResourceId,
    resource: R,
}

impl<R> Detached<R> {
    pub(crate) fn new(id: ResourceId, resource: R) -> Self {
        Self { id, resource }
    }

    /// Identity of the detached resource
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub(crate) fn into_parts(self) -> (ResourceId, R) {
        (self.id, self.resource)
    }
}

impl<R> Deref for Detached<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R> DerefMut for Detached<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.resource
    }
}

impl<R: fmt::Debug> fmt::Debug for Detached<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detached")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .finish()
    }
}

impl<R: Resource> Drop for Lease<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            if let Some(pool) = self.pool.upgrade() {
                // A rejected resource has already been closed by the pool.
                if let Err(e) = pool.give_back(self.id, resource) {
                    warn!("Dropped lease could not be returned: {}", e);
                }
            } else {
                // Pool no longer exists, close the resource
                let mut res = resource;
                res.close();
            }
        }
    }
}
