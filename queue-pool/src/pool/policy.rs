use std::fmt::{self, Display, Formatter};
use std::time::{Duration, Instant};

use crate::resource::ResourceInfo;

/// Thresholds deciding when an open resource is closed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RecyclePolicy {
    pub max_idle_time: Option<Duration>,
    pub max_open_time: Option<Duration>,
    pub max_usage_count: Option<usize>,
}

/// The threshold that caused a resource to be recycled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecycleReason {
    Idle(Duration),
    Age(Duration),
    Usage(usize),
}

impl Display for RecycleReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle(dur) => write!(f, "idle for {:?}", dur),
            Self::Age(dur) => write!(f, "open for {:?}", dur),
            Self::Usage(count) => write!(f, "used {} times", count),
        }
    }
}

impl RecyclePolicy {
    /// Check an open resource against each threshold. Any one exceeded is
    /// enough; the first found is reported.
    pub fn check(&self, info: &ResourceInfo, now: Instant) -> Option<RecycleReason> {
        if let (Some(max), Some(last_used)) = (self.max_idle_time, info.last_used) {
            let idle = now.saturating_duration_since(last_used);
            if idle > max {
                return Some(RecycleReason::Idle(idle));
            }
        }
        if let (Some(max), Some(last_opened)) = (self.max_open_time, info.last_opened) {
            let age = now.saturating_duration_since(last_opened);
            if age > max {
                return Some(RecycleReason::Age(age));
            }
        }
        match self.max_usage_count {
            Some(max) if info.usage_count >= max => Some(RecycleReason::Usage(info.usage_count)),
            _ => None,
        }
    }
}
