use std::io;
use std::time::Duration;

use thiserror::Error;

/// An error during resource checkout.
#[derive(Debug, Error)]
pub enum TakeError<E: std::error::Error + 'static> {
    /// The resource was closed and could not be reopened. It has been
    /// returned to the pool in a closed state.
    #[error("Failed to open resource '{name}': {source}")]
    Open {
        name: String,
        #[source]
        source: E,
    },
    /// No resource became available within the configured take timeout
    #[error("Timed out after {0:?} waiting for a pooled resource")]
    Timeout(Duration),
}

impl<E: std::error::Error + 'static> TakeError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(..))
    }
}

/// An error while building a pool or starting one of its workers.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config error: pool capacity must be greater than zero")]
    ZeroCapacity,
    #[error("Config error: pool name must not contain NUL bytes: {0:?}")]
    InvalidName(String),
    #[error("Config error: failed to spawn pool worker: {0}")]
    Spawn(#[from] io::Error),
}
