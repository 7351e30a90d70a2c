use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Default)]
pub(crate) struct Counters {
    taken: AtomicUsize,
    returned: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    open_failures: AtomicUsize,
    timeouts: AtomicUsize,
    waiting: AtomicUsize,
    in_use: TimeGauge,
    queued: TimeGauge,
}

macro_rules! counter_incr {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl Counters {
    counter_incr! {
        opened => opened,
        closed => closed,
        open_failed => open_failures,
        timed_out => timeouts,
    }

    pub fn taken(&self) {
        self.taken.fetch_add(1, Ordering::Relaxed);
        self.in_use.adjust(1, Instant::now());
    }

    pub fn returned(&self) {
        self.returned.fetch_add(1, Ordering::Relaxed);
        self.in_use.adjust(-1, Instant::now());
    }

    pub fn start_wait(&self) {
        self.waiting.fetch_add(1, Ordering::Relaxed);
        self.queued.adjust(1, Instant::now());
    }

    pub fn end_wait(&self) {
        self.waiting.fetch_sub(1, Ordering::Relaxed);
        self.queued.adjust(-1, Instant::now());
    }

    pub fn snapshot(&self, capacity: usize, idle: usize) -> PoolStats {
        PoolStats {
            capacity,
            idle,
            in_flight: capacity.saturating_sub(idle),
            waiting: self.waiting.load(Ordering::Relaxed),
            taken: self.taken.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            opened: self.opened.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            open_failures: self.open_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    /// Average checked out and waiting counts since the previous call.
    /// Only the stats reporter calls this, as it resets the averages.
    pub fn interval_load(&self, capacity: usize) -> IntervalLoad {
        let now = Instant::now();
        IntervalLoad::new(
            capacity,
            self.in_use.take_average(now),
            self.queued.take_average(now),
        )
    }
}

/// A gauge which integrates its value over time.
#[derive(Debug)]
pub(crate) struct TimeGauge {
    state: Mutex<GaugeState>,
}

#[derive(Debug)]
struct GaugeState {
    value: usize,
    area: f64,
    since: Instant,
    period_start: Instant,
}

impl TimeGauge {
    pub fn new(now: Instant) -> Self {
        Self {
            state: Mutex::new(GaugeState {
                value: 0,
                area: 0.0,
                since: now,
                period_start: now,
            }),
        }
    }

    pub fn adjust(&self, delta: isize, now: Instant) {
        let mut state = self.state.lock();
        state.accumulate(now);
        if delta < 0 {
            state.value = state.value.saturating_sub(delta.unsigned_abs());
        } else {
            state.value += delta as usize;
        }
    }

    /// The time-weighted average value since the last call, or since
    /// creation.
    pub fn take_average(&self, now: Instant) -> f64 {
        let mut state = self.state.lock();
        state.accumulate(now);
        let period = now.saturating_duration_since(state.period_start).as_secs_f64();
        let average = if period > 0.0 {
            state.area / period
        } else {
            state.value as f64
        };
        state.area = 0.0;
        state.period_start = now;
        average
    }
}

impl GaugeState {
    fn accumulate(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.since).as_secs_f64();
        self.area += self.value as f64 * elapsed;
        self.since = now;
    }
}

impl Default for TimeGauge {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

/// Pool usage averaged over a reporting interval.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct IntervalLoad {
    capacity: usize,
    /// Average number of resources checked out
    pub utilization: f64,
    /// Average number of resources checked out plus callers waiting
    pub load: f64,
}

impl IntervalLoad {
    fn new(capacity: usize, in_use: f64, waiting: f64) -> Self {
        Self {
            capacity,
            utilization: in_use,
            load: in_use + waiting,
        }
    }

    pub fn utilization_percent(&self) -> f64 {
        percent(self.utilization, self.capacity)
    }

    pub fn load_percent(&self) -> f64 {
        percent(self.load, self.capacity)
    }
}

fn percent(val: f64, capacity: usize) -> f64 {
    if capacity == 0 {
        0.0
    } else {
        val * 100.0 / capacity as f64
    }
}

/// A point-in-time view of a pool's usage.
///
/// `idle` and `in_flight` are read from the idle store, so a resource held by
/// a background sweep counts as in flight.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub idle: usize,
    pub in_flight: usize,
    pub waiting: usize,
    pub taken: usize,
    pub returned: usize,
    pub opened: usize,
    pub closed: usize,
    pub open_failures: usize,
    pub timeouts: usize,
}

impl PoolStats {
    /// Counter increments between an earlier snapshot and this one.
    /// Gauges (`capacity`, `idle`, `in_flight`, `waiting`) are kept from `self`.
    pub fn since(&self, earlier: &PoolStats) -> PoolStats {
        PoolStats {
            taken: self.taken.saturating_sub(earlier.taken),
            returned: self.returned.saturating_sub(earlier.returned),
            opened: self.opened.saturating_sub(earlier.opened),
            closed: self.closed.saturating_sub(earlier.closed),
            open_failures: self.open_failures.saturating_sub(earlier.open_failures),
            timeouts: self.timeouts.saturating_sub(earlier.timeouts),
            ..*self
        }
    }

    /// Percentage of capacity currently checked out.
    pub fn utilization(&self) -> f64 {
        percent(self.in_flight as f64, self.capacity)
    }
}

impl Display for PoolStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity: {}, in flight: {}, idle: {}, waiting: {}, taken: {}, returned: {}, opened: {}, closed: {}, open failures: {}, timeouts: {}",
            self.capacity,
            self.in_flight,
            self.idle,
            self.waiting,
            self.taken,
            self.returned,
            self.opened,
            self.closed,
            self.open_failures,
            self.timeouts
        )
    }
}

/// Tracks the previous snapshot for interval reports.
#[derive(Debug)]
pub(crate) struct StatsReport {
    pool: String,
    started: Instant,
    last: PoolStats,
    last_at: Instant,
}

impl StatsReport {
    pub fn new(pool: String) -> Self {
        let now = Instant::now();
        Self {
            pool,
            started: now,
            last: PoolStats::default(),
            last_at: now,
        }
    }

    pub fn report(&mut self, current: PoolStats, load: IntervalLoad) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_at);
        let delta = current.since(&self.last);
        tracing::info!(
            pool = %self.pool,
            uptime = ?now.saturating_duration_since(self.started),
            elapsed = ?elapsed,
            utilization = load.utilization,
            utilization_percent = load.utilization_percent(),
            load = load.load,
            load_percent = load.load_percent(),
            taken_rate = rate(delta.taken, elapsed),
            returned_rate = rate(delta.returned, elapsed),
            opened_rate = rate(delta.opened, elapsed),
            closed_rate = rate(delta.closed, elapsed),
            "pool stats: {}; last interval: taken {}, returned {}, opened {}, closed {}",
            current,
            delta.taken,
            delta.returned,
            delta.opened,
            delta.closed
        );
        self.last = current;
        self.last_at = now;
    }
}

fn rate(count: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}
