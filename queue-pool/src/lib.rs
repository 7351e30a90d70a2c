//! A blocking, fixed-capacity resource pool.
//!
//! Resources are any type implementing [`Resource`]: something which can
//! open a live handle, close it again and optionally check its health. The
//! pool hands out the most recently returned resource first, opens closed
//! resources on demand and closes resources which have been idle, open or in
//! use for too long.
//!
//! ```
//! use std::convert::Infallible;
//! use queue_pool::{ManagedResource, PoolConfig, Resource};
//!
//! struct Session(u32);
//!
//! impl Resource for Session {
//!     type Handle = String;
//!     type Error = Infallible;
//!
//!     fn open(&mut self) -> Result<String, Infallible> {
//!         self.0 += 1;
//!         Ok(format!("session-{}", self.0))
//!     }
//!
//!     fn close(&mut self, _handle: String) -> Result<(), Infallible> {
//!         Ok(())
//!     }
//! }
//!
//! let pool = PoolConfig::new(2).name("sessions").build::<Session>().unwrap();
//! pool.populate((0..2).map(|i| ManagedResource::new(format!("slot-{}", i), Session(0))));
//!
//! let session = pool.acquire().unwrap();
//! assert_eq!(*session, "session-1");
//! ```

mod pool;
pub use self::pool::{
    ConfigError, Pool, PoolConfig, PoolStats, Pooled, RecyclePolicy, RecycleReason, Recycler,
    TakeError,
};

mod resource;
pub use self::resource::{Health, ManagedResource, RepairPoint, Resource, ResourceInfo};

mod util;
