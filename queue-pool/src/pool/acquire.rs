use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::thread;

use super::pool::Pool;
use crate::resource::{ManagedResource, Resource, ResourceInfo};

/// A checked out resource which is returned to its pool when dropped.
///
/// Dereferences to the resource handle. If the guard is dropped during a
/// panic and the pool closes on exception, the resource is closed before it
/// is returned.
pub struct Pooled<R: Resource> {
    pool: Pool<R>,
    value: Option<ManagedResource<R>>,
    discard: bool,
}

impl<R: Resource> Pooled<R> {
    pub(crate) fn new(pool: Pool<R>, value: ManagedResource<R>) -> Self {
        Self {
            pool,
            value: Some(value),
            discard: false,
        }
    }

    /// Close the resource when it is returned instead of keeping the handle
    /// open for the next caller.
    pub fn discard(pooled: &mut Self) {
        pooled.discard = true;
    }

    pub fn name(pooled: &Self) -> &str {
        Self::managed(pooled).name()
    }

    pub fn info(pooled: &Self) -> &ResourceInfo {
        Self::managed(pooled).info()
    }

    pub fn managed(pooled: &Self) -> &ManagedResource<R> {
        // note: only empty once dropped
        pooled.value.as_ref().unwrap()
    }

    pub fn pool(pooled: &Self) -> &Pool<R> {
        &pooled.pool
    }
}

impl<R: Resource> Debug for Pooled<R>
where
    R::Handle: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.debug_struct("Pooled")
                .field("name", &Self::name(self))
                .field("handle", self.deref())
                .field("info", Self::info(self))
                .finish()
        } else {
            Debug::fmt(self.deref(), f)
        }
    }
}

impl<R: Resource> Deref for Pooled<R> {
    type Target = R::Handle;

    fn deref(&self) -> &Self::Target {
        // note: a taken resource stays open until the guard is dropped
        Self::managed(self).handle().unwrap()
    }
}

impl<R: Resource> DerefMut for Pooled<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().and_then(ManagedResource::handle_mut).unwrap()
    }
}

impl<R: Resource> Drop for Pooled<R> {
    fn drop(&mut self) {
        if let Some(mut value) = self.value.take() {
            if self.discard || (thread::panicking() && self.pool.close_on_exception()) {
                self.pool.inner.close(&mut value);
            }
            self.pool.put(value);
        }
    }
}
