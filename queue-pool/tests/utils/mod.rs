use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use queue_pool::{Health, ManagedResource, RepairPoint, Resource, TakeError};

#[derive(Debug)]
pub struct AtomicCounter {
    count: AtomicUsize,
}

#[allow(unused)]
impl AtomicCounter {
    pub fn new(val: usize) -> Self {
        Self {
            count: AtomicUsize::new(val),
        }
    }

    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn decrement(&self) -> usize {
        self.count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn value(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Raise the stored value to at least `val`.
    pub fn fetch_max(&self, val: usize) -> usize {
        self.count.fetch_max(val, Ordering::SeqCst)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TestError(pub &'static str);

impl Display for TestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "test error: {}", self.0)
    }
}

impl std::error::Error for TestError {}

/// Shared observations of every resource created from the same tally.
#[derive(Debug, Default)]
pub struct Tally {
    pub opened: AtomicCounter,
    pub closed: AtomicCounter,
    pub repaired: AtomicCounter,
    pub fail_open: AtomicBool,
    pub break_on_take: AtomicBool,
}

#[allow(unused)]
impl Tally {
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Report every handle as broken when it is checked out.
    pub fn set_break_on_take(&self, broken: bool) {
        self.break_on_take.store(broken, Ordering::SeqCst);
    }

    pub fn live(&self) -> usize {
        self.opened.value() - self.closed.value()
    }
}

/// A live handle, with flags a test can set to simulate a connection left
/// mid-transaction or dropped by the remote peer.
#[derive(Debug)]
pub struct Conn {
    pub slot: usize,
    pub generation: usize,
    pub in_transaction: bool,
    pub dropped: bool,
}

#[derive(Debug)]
pub struct TestResource {
    slot: usize,
    generation: usize,
    tally: Arc<Tally>,
}

impl Resource for TestResource {
    type Handle = Conn;
    type Error = TestError;

    fn open(&mut self) -> Result<Conn, TestError> {
        if self.tally.fail_open.load(Ordering::SeqCst) {
            return Err(TestError("connection refused"));
        }
        self.tally.opened.increment();
        self.generation += 1;
        Ok(Conn {
            slot: self.slot,
            generation: self.generation,
            in_transaction: false,
            dropped: false,
        })
    }

    fn close(&mut self, _handle: Conn) -> Result<(), TestError> {
        self.tally.closed.increment();
        Ok(())
    }

    fn repair(&mut self, handle: &mut Conn, point: RepairPoint) -> Health {
        if point == RepairPoint::Take && self.tally.break_on_take.load(Ordering::SeqCst) {
            Health::Broken
        } else if handle.dropped {
            Health::Broken
        } else if handle.in_transaction {
            handle.in_transaction = false;
            self.tally.repaired.increment();
            Health::Repaired
        } else {
            Health::Healthy
        }
    }
}

pub fn test_resources(
    tally: &Arc<Tally>,
    count: usize,
) -> impl Iterator<Item = ManagedResource<TestResource>> {
    let tally = tally.clone();
    (0..count).map(move |slot| {
        ManagedResource::new(
            format!("slot-{}", slot),
            TestResource {
                slot,
                generation: 0,
                tally: tally.clone(),
            },
        )
    })
}

#[derive(Debug)]
pub enum ScopeError {
    Take(TakeError<TestError>),
    Failed,
}

impl From<TakeError<TestError>> for ScopeError {
    fn from(err: TakeError<TestError>) -> Self {
        Self::Take(err)
    }
}

/// Spin until `check` passes, panicking after a generous timeout.
#[allow(unused)]
pub fn wait_for(mut check: impl FnMut() -> bool) {
    let start = Instant::now();
    while !check() {
        assert!(
            start.elapsed() < Duration::from_secs(10),
            "condition not reached"
        );
        thread::sleep(Duration::from_millis(1));
    }
}
