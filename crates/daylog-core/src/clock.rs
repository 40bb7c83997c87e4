//! Wall clock abstraction used for timestamps, windows and day rotation.

use chrono::{DateTime, Duration, Local};
use parking_lot::Mutex;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The system's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to. Used to drive repeat windows,
/// size-check intervals and day rotation deterministically.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_advances() {
        let start = Local.with_ymd_and_hms(2026, 1, 21, 23, 59, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::minutes(2));

        assert_eq!(clock.now().date_naive().to_string(), "2026-01-22");
    }
}
