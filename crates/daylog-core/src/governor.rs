//! Daily size budget shared by all loggers of a registry.
//!
//! At most once per check interval the governor sums the sizes of the current
//! day's log files. Once the budget is exceeded every logger stops writing
//! until a later check finds the day's total back under budget.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use crate::config::LogConfig;
use crate::maintenance;

/// Notice written to every logger when the budget is first exceeded.
pub const SIZE_LIMIT_NOTICE: &str = "Logs are stopped due to day size limit.";

/// Decision for one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Logging is suppressed
    Blocked,
    /// Write may proceed; `overflowed` asks the caller to announce and
    /// engage suppression once its own write is done
    Open { overflowed: bool },
}

#[derive(Debug, Default)]
pub struct SizeGovernor {
    next_check: Mutex<Option<DateTime<Local>>>,
    limited: AtomicBool,
}

impl SizeGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether logging is currently suppressed.
    pub fn is_limited(&self) -> bool {
        self.limited.load(Ordering::Relaxed)
    }

    /// Suppress all writes until the next check clears it.
    pub fn engage(&self) {
        self.limited.store(true, Ordering::Relaxed);
    }

    pub fn admit(&self, config: &LogConfig, now: DateTime<Local>) -> Admission {
        let verdict = self.check(config, now);
        if self.is_limited() && verdict.unwrap_or(true) {
            return Admission::Blocked;
        }
        self.limited.store(false, Ordering::Relaxed);
        Admission::Open {
            overflowed: verdict == Some(true),
        }
    }

    /// `None` when no check is due, otherwise whether the day is over budget.
    fn check(&self, config: &LogConfig, now: DateTime<Local>) -> Option<bool> {
        let budget = config.daily_budget();
        if budget <= 0 {
            return Some(false);
        }

        {
            let mut next_check = self.next_check.lock();
            if matches!(*next_check, Some(at) if at > now) {
                return None;
            }
            // Past the end of the calendar every write checks again.
            *next_check = Some(
                now.checked_add_signed(config.tunables().size_check_interval)
                    .unwrap_or(now),
            );
        }

        let Some(root) = config.root() else {
            return Some(false);
        };
        let used = maintenance::day_usage(&root, now.date_naive());
        tracing::debug!(used, budget, "checked daily log size");
        Some(used > budget as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::fs;
    use tempfile::TempDir;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 21, 9, 0, 0).unwrap()
    }

    fn config(root: &std::path::Path, budget: i64) -> LogConfig {
        LogConfig::builder()
            .root(root)
            .app_tag("sim")
            .daily_budget(budget)
            .build()
    }

    #[test]
    fn test_unlimited_budget_never_blocks() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("2026-01-21_sim_a.log"), vec![b'x'; 100]).unwrap();
        let governor = SizeGovernor::new();
        governor.engage();

        let config = config(temp.path(), 0);
        assert_eq!(
            governor.admit(&config, now()),
            Admission::Open { overflowed: false }
        );
        assert!(!governor.is_limited());
    }

    #[test]
    fn test_over_budget_reports_overflow_once_per_interval() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("2026-01-21_sim_a.log"), vec![b'x'; 100]).unwrap();
        let config = config(temp.path(), 50);
        let governor = SizeGovernor::new();

        assert_eq!(
            governor.admit(&config, now()),
            Admission::Open { overflowed: true }
        );
        governor.engage();

        // No check is due yet: stays blocked.
        assert_eq!(
            governor.admit(&config, now() + Duration::minutes(1)),
            Admission::Blocked
        );

        // Still over budget at the next check.
        assert_eq!(
            governor.admit(&config, now() + Duration::minutes(5)),
            Admission::Blocked
        );
    }

    #[test]
    fn test_limit_clears_when_usage_drops() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("2026-01-21_sim_a.log");
        fs::write(&file, vec![b'x'; 100]).unwrap();
        let config = config(temp.path(), 50);
        let governor = SizeGovernor::new();

        governor.admit(&config, now());
        governor.engage();

        fs::write(&file, b"x").unwrap();
        assert_eq!(
            governor.admit(&config, now() + Duration::minutes(5)),
            Admission::Open { overflowed: false }
        );
        assert!(!governor.is_limited());
    }

    #[test]
    fn test_other_days_do_not_count() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("2026-01-20_sim_a.log"), vec![b'x'; 100]).unwrap();
        let config = config(temp.path(), 50);

        assert_eq!(
            SizeGovernor::new().admit(&config, now()),
            Admission::Open { overflowed: false }
        );
    }

    #[test]
    fn test_interval_past_end_of_calendar_does_not_panic() {
        let temp = TempDir::new().unwrap();
        let last_day = chrono::NaiveDate::MAX;
        fs::write(
            temp.path().join(format!("{}_sim_a.log", last_day.format("%Y-%m-%d"))),
            vec![b'x'; 100],
        )
        .unwrap();
        let config = LogConfig::builder()
            .root(temp.path())
            .app_tag("sim")
            .daily_budget(50)
            .size_check_interval(Duration::days(365))
            .build();
        let at = Local
            .from_local_datetime(&last_day.and_hms_opt(0, 0, 0).unwrap())
            .earliest()
            .unwrap();

        let governor = SizeGovernor::new();
        assert_eq!(
            governor.admit(&config, at),
            Admission::Open { overflowed: true }
        );
    }
}
