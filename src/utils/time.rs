use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Half-width of the search window used when an event has to be found by teams and date.
pub const FALLBACK_WINDOW_HOURS: i64 = 12;

/// Source of "now" for anything time-dependent (cache expiry, game-start checks).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Returns true once `now` has reached the scheduled start.
pub fn has_started(now: DateTime<Utc>, starts_at: DateTime<Utc>) -> bool {
    now >= starts_at
}

/// Search window `[start - hours, start + hours]` for the team/date fallback lookup.
pub fn fallback_window(starts_at: DateTime<Utc>, hours: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let half = Duration::hours(hours);
    (starts_at - half, starts_at + half)
}
