use std::fmt::{self, Display, Formatter};
use std::time::Instant;

mod managed;
pub use managed::ManagedResource;

/// The capability a type must provide to be held by a [`Pool`](crate::Pool).
///
/// A `Resource` is the factory and owner-side state for one pooled slot: it
/// knows how to open a live handle, how to close it again, and optionally how
/// to inspect a handle around checkout and check-in.
pub trait Resource: Send + 'static {
    /// The live handle produced by [`open`](Resource::open), such as a
    /// database connection or a mail transport session.
    type Handle: Send + 'static;

    /// The error produced when opening or closing a handle fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Acquire a new live handle.
    fn open(&mut self) -> Result<Self::Handle, Self::Error>;

    /// Release a live handle. The handle is considered closed regardless of
    /// the result.
    fn close(&mut self, handle: Self::Handle) -> Result<(), Self::Error>;

    /// Inspect a live handle before it is handed to a caller or before it is
    /// returned to the idle store, applying any local correction needed.
    fn repair(&mut self, _handle: &mut Self::Handle, _point: RepairPoint) -> Health {
        Health::Healthy
    }
}

/// The point in the take/put cycle at which a repair is performed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RepairPoint {
    /// After the resource was removed from the idle store, before use
    Take,
    /// After use, before the resource is returned to the idle store
    Put,
}

impl Display for RepairPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Take => write!(f, "take"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// The outcome of a [`Resource::repair`] check.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Health {
    /// The handle is usable and idle
    Healthy,
    /// The handle was left in an inconsistent state and has been corrected
    /// in place, for example by rolling back an open transaction
    Repaired,
    /// The handle is unusable and must be closed
    Broken,
}

/// Lifecycle bookkeeping for a managed resource.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceInfo {
    /// When the current handle was opened, `None` while closed
    pub last_opened: Option<Instant>,
    /// The most recent checkout or check-in
    pub last_used: Option<Instant>,
    /// Number of checkouts since the current handle was opened
    pub usage_count: usize,
}
