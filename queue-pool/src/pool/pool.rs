use std::fmt::{self, Debug, Formatter};
use std::io;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use super::acquire::Pooled;
use super::config::PoolConfig;
use super::error::{ConfigError, TakeError};
use super::policy::RecyclePolicy;
use super::recycler::Recycler;
use super::stats::{Counters, PoolStats, StatsReport};
use crate::resource::{Health, ManagedResource, RepairPoint, Resource};
use crate::util::{LifoStore, Worker};

pub(crate) struct PoolInner<R: Resource> {
    name: String,
    close_on_exception: bool,
    take_timeout: Option<Duration>,
    policy: RecyclePolicy,
    store: LifoStore<ManagedResource<R>>,
    counters: Counters,
}

impl<R: Resource> PoolInner<R> {
    fn new(config: PoolConfig) -> Self {
        Self {
            policy: RecyclePolicy {
                max_idle_time: config.max_idle_time,
                max_open_time: config.max_open_time,
                max_usage_count: config.max_usage_count,
            },
            name: config.name,
            close_on_exception: config.close_on_exception,
            take_timeout: config.take_timeout,
            store: LifoStore::new(config.capacity),
            counters: Counters::default(),
        }
    }

    pub fn close(&self, res: &mut ManagedResource<R>) {
        if res.is_open() {
            res.close();
            self.counters.closed();
        }
    }

    /// Apply the recycling policy, returning `true` if the resource was closed.
    pub fn recycle(&self, res: &mut ManagedResource<R>, now: Instant) -> bool {
        if !res.is_open() {
            return false;
        }
        match self.policy.check(res.info(), now) {
            Some(reason) => {
                tracing::info!(
                    pool = %self.name,
                    resource = %res.name(),
                    %reason,
                    "recycling resource"
                );
                self.close(res);
                true
            }
            None => false,
        }
    }

    fn repair(&self, res: &mut ManagedResource<R>, point: RepairPoint) {
        if res.is_open() && res.repair(point) == Health::Broken {
            self.counters.closed();
        }
    }

    /// Return a resource to the idle store. Only a caller breaking the
    /// one-take-one-put rule can overflow the store.
    fn restore(&self, res: ManagedResource<R>) {
        if let Err(res) = self.store.push(res) {
            self.overflow(res);
        }
    }

    fn overflow(&self, mut res: ManagedResource<R>) {
        tracing::error!(
            pool = %self.name,
            resource = %res.name(),
            capacity = self.store.capacity(),
            "pool is full, dropping returned resource"
        );
        self.close(&mut res);
    }

    /// Check every idle resource against the recycling policy. Resources
    /// returned while the sweep runs stay on top of the swept ones.
    pub fn sweep(&self) -> usize {
        let mut idle = self.store.drain();
        let count = idle.len();
        let now = Instant::now();
        let mut recycled = 0;
        for res in idle.iter_mut() {
            if self.recycle(res, now) {
                recycled += 1;
            }
        }
        for res in self.store.refill(idle) {
            self.overflow(res);
        }
        tracing::trace!(pool = %self.name, idle = count, recycled, "swept idle resources");
        recycled
    }

    fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.store.capacity(), self.store.len())
    }
}

impl<R: Resource> Drop for PoolInner<R> {
    fn drop(&mut self) {
        for mut res in self.store.drain() {
            res.close();
        }
        tracing::debug!(pool = %self.name, "pool shut down");
    }
}

fn spawn_recycler<R: Resource>(
    inner: &Arc<PoolInner<R>>,
    interval: Duration,
) -> io::Result<Worker> {
    let weak = Arc::downgrade(inner);
    Worker::spawn(format!("{}-recycler", inner.name), interval, move || {
        with_pool(&weak, |inner| {
            inner.sweep();
        })
    })
}

fn spawn_reporter<R: Resource>(
    inner: &Arc<PoolInner<R>>,
    interval: Duration,
) -> io::Result<Worker> {
    let weak = Arc::downgrade(inner);
    let mut report = StatsReport::new(inner.name.clone());
    Worker::spawn(format!("{}-stats", inner.name), interval, move || {
        with_pool(&weak, |inner| {
            let load = inner.counters.interval_load(inner.store.capacity());
            report.report(inner.stats(), load)
        })
    })
}

// Workers only keep a weak reference, so they wind down with the pool.
fn with_pool<R: Resource>(weak: &Weak<PoolInner<R>>, f: impl FnOnce(&PoolInner<R>)) -> bool {
    match weak.upgrade() {
        Some(inner) => {
            f(&inner);
            true
        }
        None => false,
    }
}

/// A fixed-capacity, last-in-first-out pool of managed resources.
///
/// The pool starts empty: populate it with `capacity` resources using
/// [`Pool::populate`] before the first [`Pool::take`]. Cloning a `Pool` is
/// cheap and yields another handle to the same pool.
pub struct Pool<R: Resource> {
    pub(crate) inner: Arc<PoolInner<R>>,
    workers: Arc<Vec<Worker>>,
}

impl<R: Resource> Pool<R> {
    pub(crate) fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        let recycle_interval = config.recycle_interval;
        let stats_interval = config.stats_interval;
        let inner = Arc::new(PoolInner::new(config));
        let mut workers = Vec::new();
        if let Some(interval) = recycle_interval {
            workers.push(spawn_recycler(&inner, interval)?);
        }
        if let Some(interval) = stats_interval {
            workers.push(spawn_reporter(&inner, interval)?);
        }
        Ok(Self {
            inner,
            workers: Arc::new(workers),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn capacity(&self) -> usize {
        self.inner.store.capacity()
    }

    pub fn close_on_exception(&self) -> bool {
        self.inner.close_on_exception
    }

    pub fn policy(&self) -> &RecyclePolicy {
        &self.inner.policy
    }

    /// The number of resources currently waiting in the idle store.
    pub fn idle_count(&self) -> usize {
        self.inner.store.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.stats()
    }

    /// Add resources to the idle store, returning how many were accepted.
    /// Resources beyond the pool capacity are closed and dropped.
    pub fn populate<I>(&self, resources: I) -> usize
    where
        I: IntoIterator<Item = ManagedResource<R>>,
    {
        let mut added = 0;
        for res in resources {
            if let Err(mut res) = self.inner.store.push(res) {
                tracing::warn!(
                    pool = %self.inner.name,
                    resource = %res.name(),
                    capacity = self.capacity(),
                    "pool is already populated, discarding resource"
                );
                self.inner.close(&mut res);
            } else {
                added += 1;
            }
        }
        added
    }

    /// Check out the most recently returned resource, waiting for one to
    /// become available.
    ///
    /// The resource is recycled and repaired as needed and opened if it is
    /// closed. If opening fails the resource goes back to the pool closed,
    /// and the error is returned. Every successful `take` must be matched by
    /// exactly one [`Pool::put`].
    pub fn take(&self) -> Result<ManagedResource<R>, TakeError<R::Error>> {
        let inner = &self.inner;
        let deadline = inner.take_timeout.map(|timeout| Instant::now() + timeout);
        inner.counters.start_wait();
        let res = inner.store.pop(deadline);
        inner.counters.end_wait();
        let mut res = match res {
            Some(res) => res,
            None => {
                let timeout = inner.take_timeout.unwrap_or_default();
                inner.counters.timed_out();
                tracing::debug!(pool = %inner.name, ?timeout, "timed out waiting for resource");
                return Err(TakeError::Timeout(timeout));
            }
        };

        inner.recycle(&mut res, Instant::now());
        inner.repair(&mut res, RepairPoint::Take);
        if !res.is_open() {
            if let Err(source) = res.open() {
                inner.counters.open_failed();
                tracing::warn!(
                    pool = %inner.name,
                    resource = %res.name(),
                    error = %source,
                    "failed to open resource"
                );
                let name = res.name().to_owned();
                inner.restore(res);
                return Err(TakeError::Open { name, source });
            }
            inner.counters.opened();
        }
        res.mark_taken(Instant::now());
        inner.counters.taken();
        Ok(res)
    }

    /// Return a resource obtained from [`Pool::take`]. Never blocks or fails:
    /// a resource that is expired or reported broken goes back closed and
    /// is reopened by the next `take`.
    pub fn put(&self, mut res: ManagedResource<R>) {
        let inner = &self.inner;
        res.touch(Instant::now());
        inner.recycle(&mut res, Instant::now());
        inner.repair(&mut res, RepairPoint::Put);
        inner.counters.returned();
        inner.restore(res);
    }

    /// Check out a resource wrapped in a guard that puts it back when
    /// dropped.
    pub fn acquire(&self) -> Result<Pooled<R>, TakeError<R::Error>> {
        let res = self.take()?;
        Ok(Pooled::new(self.clone(), res))
    }

    /// Run `f` with the handle of a checked out resource, returning the
    /// resource afterwards. When `f` fails and the pool closes on exception,
    /// the resource is closed before it is returned.
    pub fn scoped<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut R::Handle) -> Result<T, E>,
        E: From<TakeError<R::Error>>,
    {
        let mut guard = self.acquire()?;
        let result = f(&mut *guard);
        if result.is_err() && self.close_on_exception() {
            Pooled::discard(&mut guard);
        }
        result
    }

    /// Apply the recycling policy to every idle resource now.
    /// Returns the number of resources closed.
    pub fn recycle_idle(&self) -> usize {
        self.inner.sweep()
    }

    /// Start a background sweep of the idle resources. The sweep runs until
    /// the returned handle is stopped or dropped, or the pool is dropped.
    pub fn start_recycler(&self, interval: Duration) -> Result<Recycler, ConfigError> {
        let worker = spawn_recycler(&self.inner, interval)?;
        Ok(Recycler::new(worker))
    }
}

impl<R: Resource> Clone for Pool<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            workers: self.workers.clone(),
        }
    }
}

impl<R: Resource> Debug for Pool<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name())
            .field("capacity", &self.capacity())
            .field("idle", &self.idle_count())
            .field("workers", &self.workers.len())
            .finish()
    }
}
