mod acquire;
pub use acquire::Pooled;

mod config;
pub use config::PoolConfig;

mod error;
pub use error::{ConfigError, TakeError};

mod policy;
pub use policy::{RecyclePolicy, RecycleReason};

mod pool;
pub use pool::Pool;

mod recycler;
pub use recycler::Recycler;

mod stats;
pub use stats::PoolStats;
