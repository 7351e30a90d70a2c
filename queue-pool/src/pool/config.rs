use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::Pool;
use crate::resource::Resource;

const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(300);
const DEFAULT_MAX_OPEN_TIME: Duration = Duration::from_secs(300);
const DEFAULT_MAX_USAGE_COUNT: usize = 1000;

/// Builder for a [`Pool`].
///
/// Durations and counts set to zero disable the corresponding setting.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    pub(crate) name: String,
    pub(crate) capacity: usize,
    pub(crate) max_idle_time: Option<Duration>,
    pub(crate) max_open_time: Option<Duration>,
    pub(crate) max_usage_count: Option<usize>,
    pub(crate) close_on_exception: bool,
    pub(crate) take_timeout: Option<Duration>,
    pub(crate) recycle_interval: Option<Duration>,
    pub(crate) stats_interval: Option<Duration>,
}

impl PoolConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            name: "pool".to_owned(),
            capacity,
            max_idle_time: Some(DEFAULT_MAX_IDLE_TIME),
            max_open_time: Some(DEFAULT_MAX_OPEN_TIME),
            max_usage_count: Some(DEFAULT_MAX_USAGE_COUNT),
            close_on_exception: true,
            take_timeout: None,
            recycle_interval: None,
            stats_interval: None,
        }
    }

    /// Label used in log events and worker thread names.
    pub fn name(mut self, val: impl Into<String>) -> Self {
        self.name = val.into();
        self
    }

    pub fn capacity(mut self, val: usize) -> Self {
        self.capacity = val;
        self
    }

    /// Close a resource left open and unused for longer than this.
    pub fn max_idle_time(mut self, val: Duration) -> Self {
        self.max_idle_time = non_zero(val);
        self
    }

    /// Close a resource that has been open for longer than this.
    pub fn max_open_time(mut self, val: Duration) -> Self {
        self.max_open_time = non_zero(val);
        self
    }

    /// Close a resource once it has been taken this many times since it
    /// was opened.
    pub fn max_usage_count(mut self, val: usize) -> Self {
        if val > 0 {
            self.max_usage_count.replace(val);
        } else {
            self.max_usage_count.take();
        }
        self
    }

    /// Whether a scoped acquisition that fails closes its resource before
    /// returning it to the pool.
    pub fn close_on_exception(mut self, val: bool) -> Self {
        self.close_on_exception = val;
        self
    }

    /// Bound the time `take` waits for an idle resource.
    pub fn take_timeout(mut self, val: Duration) -> Self {
        self.take_timeout = non_zero(val);
        self
    }

    /// Run a background sweep of the idle resources at this interval for as
    /// long as the pool exists.
    pub fn recycle_interval(mut self, val: Duration) -> Self {
        self.recycle_interval = non_zero(val);
        self
    }

    /// Log pool statistics at this interval for as long as the pool exists.
    pub fn stats_interval(mut self, val: Duration) -> Self {
        self.stats_interval = non_zero(val);
        self
    }

    pub fn build<R: Resource>(self) -> Result<Pool<R>, ConfigError> {
        Pool::new(self.validate()?)
    }

    /// Check the settings and disable any set to zero. Deserialized configs
    /// do not pass through the setters, so this is repeated here.
    fn validate(mut self) -> Result<Self, ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        // worker threads are named after the pool
        if self.name.contains('\0') {
            return Err(ConfigError::InvalidName(self.name));
        }
        self.max_idle_time = self.max_idle_time.and_then(non_zero);
        self.max_open_time = self.max_open_time.and_then(non_zero);
        self.max_usage_count = self.max_usage_count.filter(|count| *count > 0);
        self.take_timeout = self.take_timeout.and_then(non_zero);
        self.recycle_interval = self.recycle_interval.and_then(non_zero);
        self.stats_interval = self.stats_interval.and_then(non_zero);
        Ok(self)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

fn non_zero(val: Duration) -> Option<Duration> {
    if val.as_micros() > 0 {
        Some(val)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = PoolConfig::new(4);
        assert_eq!(config.capacity, 4);
        assert_eq!(config.max_idle_time, Some(Duration::from_secs(300)));
        assert_eq!(config.max_open_time, Some(Duration::from_secs(300)));
        assert_eq!(config.max_usage_count, Some(1000));
        assert!(config.close_on_exception);
        assert_eq!(config.take_timeout, None);
        assert_eq!(config.recycle_interval, None);
    }

    #[test]
    fn config_zero_disables() {
        let config = PoolConfig::new(1)
            .max_idle_time(Duration::from_secs(0))
            .max_open_time(Duration::from_secs(0))
            .max_usage_count(0)
            .take_timeout(Duration::from_millis(0));
        assert_eq!(config.max_idle_time, None);
        assert_eq!(config.max_open_time, None);
        assert_eq!(config.max_usage_count, None);
        assert_eq!(config.take_timeout, None);
    }

    #[test]
    fn config_validate() {
        assert!(matches!(
            PoolConfig::new(0).validate(),
            Err(ConfigError::ZeroCapacity)
        ));
        match PoolConfig::new(1).name("db\0pool").validate() {
            Err(ConfigError::InvalidName(name)) => assert_eq!(name, "db\0pool"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_deserialize_zero_disables() {
        let config: PoolConfig = serde_json::from_str(
            r#"{
                "capacity": 1,
                "max_idle_time": {"secs": 0, "nanos": 0},
                "max_open_time": {"secs": 0, "nanos": 0},
                "max_usage_count": 0,
                "take_timeout": {"secs": 0, "nanos": 0},
                "recycle_interval": {"secs": 0, "nanos": 0},
                "stats_interval": {"secs": 0, "nanos": 0}
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_usage_count, Some(0));

        let config = config.validate().unwrap();
        assert_eq!(config.max_idle_time, None);
        assert_eq!(config.max_open_time, None);
        assert_eq!(config.max_usage_count, None);
        assert_eq!(config.take_timeout, None);
        assert_eq!(config.recycle_interval, None);
        assert_eq!(config.stats_interval, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_deserialize_partial() {
        let config: PoolConfig =
            serde_json::from_str(r#"{"name": "db", "capacity": 8, "close_on_exception": false}"#)
                .unwrap();
        assert_eq!(config.name, "db");
        assert_eq!(config.capacity, 8);
        assert!(!config.close_on_exception);
        assert_eq!(config.max_usage_count, Some(1000));
    }
}
