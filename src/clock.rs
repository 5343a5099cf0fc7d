//! Clock abstraction for time retrieval.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Trait for clock implementations.
///
/// Interval boundaries and cache expiry are both derived from the current
/// instant, so the limiter takes its clock through this trait rather than
/// reading the system time directly. Implementors must be thread-safe.
pub trait Clock: Send + Sync {
    /// Get the current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the host's wall clock.
///
/// This is the default clock used by the limiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// This is primarily useful for testing: interval rollover and cache
/// expiry can be simulated by advancing the clock past a boundary.
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a manual clock frozen at the given instant.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move the clock to a specific instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.write();
        *now = *now + duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}
