//! Log directory maintenance: per-day file listing, usage, and cleanup of
//! files past their retention period.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Local, NaiveDate};

use crate::logger::Logger;

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub deleted: usize,
    pub failed: usize,
    /// Retention under one day; nothing was touched
    pub skipped: bool,
}

/// Every log file of `date` under `root`, searched recursively.
///
/// A missing root yields an empty list.
pub fn log_files_for(root: &Path, date: NaiveDate) -> Vec<PathBuf> {
    let prefix = format!("{}_", date.format("%Y-%m-%d"));
    let mut files = Vec::new();
    collect_files(root, true, &mut files);
    files.retain(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(&prefix) && name.ends_with(".log"))
            .unwrap_or(false)
    });
    files.sort();
    files
}

/// Total size in bytes of the log files of `date`.
pub fn day_usage(root: &Path, date: NaiveDate) -> u64 {
    log_files_for(root, date)
        .iter()
        .filter_map(|path| fs::metadata(path).ok())
        .map(|meta| meta.len())
        .sum()
}

/// Whether `name` looks like `YYYY-MM-DD_{tag}_*.log` (or `YYYY-MM-DD_*.log`
/// when `tag` is empty).
pub fn is_day_file(name: &str, app_tag: &str) -> bool {
    if !name.ends_with(".log") || name.len() < 11 || !name.is_char_boundary(10) {
        return false;
    }
    let (date, rest) = name.split_at(10);
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return false;
    }
    let Some(rest) = rest.strip_prefix('_') else {
        return false;
    };
    app_tag.is_empty() || rest.starts_with(&format!("{}_", app_tag))
}

/// Delete log files last modified before `now - retention`.
///
/// With `clean_all` every file under `root` is a candidate; otherwise only
/// this application's day files at the top level. Each deletion, failure
/// and the final count are reported through `reporter`.
pub fn clean(
    root: &Path,
    app_tag: &str,
    now: DateTime<Local>,
    retention: Duration,
    reporter: Option<&Logger>,
    clean_all: bool,
) -> CleanReport {
    let mut report = CleanReport::default();

    if retention < Duration::days(1) {
        if let Some(reporter) = reporter {
            reporter.info(
                "Cleaning of old log files is switched off due to zero log storing period.",
                crate::call_site!(),
            );
        }
        report.skipped = true;
        return report;
    }

    let Some(cutoff) = now.checked_sub_signed(retention) else {
        tracing::debug!(days = retention.num_days(), "retention reaches before any file, nothing to clean");
        return report;
    };
    let cutoff: SystemTime = cutoff.into();
    let mut candidates = Vec::new();
    collect_files(root, clean_all, &mut candidates);
    if !clean_all {
        candidates.retain(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| is_day_file(name, app_tag))
                .unwrap_or(false)
        });
    }

    for path in candidates {
        let modified = match fs::metadata(&path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if modified >= cutoff {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                report.deleted += 1;
                if let Some(reporter) = reporter {
                    reporter.info(
                        &format!("file '{}' is deleted.", path.display()),
                        crate::call_site!(),
                    );
                }
            }
            Err(err) => {
                report.failed += 1;
                if let Some(reporter) = reporter {
                    reporter
                        .event(crate::Level::Error, crate::call_site!())
                        .error(&err)
                        .log(&format!("Error deleting the old log file: {}", path.display()));
                }
            }
        }
    }

    if report.deleted > 0 {
        if let Some(reporter) = reporter {
            reporter.info(
                &format!("{} old log files was deleted.", report.deleted),
                crate::call_site!(),
            );
        }
    }

    tracing::debug!(
        root = %root.display(),
        deleted = report.deleted,
        failed = report.failed,
        "log cleanup finished"
    );
    report
}

fn collect_files(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        match entry.file_type() {
            Ok(kind) if kind.is_dir() => {
                if recursive {
                    collect_files(&path, true, out);
                }
            }
            Ok(kind) if kind.is_file() => out.push(path),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    #[test]
    fn test_is_day_file() {
        assert!(is_day_file("2026-01-21_sim_net.log", "sim"));
        assert!(is_day_file("2026-01-21_other_net.log", ""));
        assert!(!is_day_file("2026-01-21_other_net.log", "sim"));
        assert!(!is_day_file("notes_sim_net.log", "sim"));
        assert!(!is_day_file("2026-01-21_sim_net.txt", "sim"));
        assert!(!is_day_file("2026-13-45_sim_net.log", "sim"));
    }

    #[test]
    fn test_log_files_for_date() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("archive");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join("2026-01-21_sim_a.log"), "aaaa").unwrap();
        fs::write(nested.join("2026-01-21_sim_b.log"), "bb").unwrap();
        fs::write(temp.path().join("2026-01-20_sim_a.log"), "old").unwrap();
        fs::write(temp.path().join("2026-01-21_notes.txt"), "txt").unwrap();

        let files = log_files_for(temp.path(), date(21));
        assert_eq!(files.len(), 2);
        assert_eq!(day_usage(temp.path(), date(21)), 6);
    }

    #[test]
    fn test_missing_root_has_no_files() {
        let temp = TempDir::new().unwrap();
        assert!(log_files_for(&temp.path().join("missing"), date(21)).is_empty());
    }

    #[test]
    fn test_short_retention_is_skipped() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("2026-01-01_sim_a.log");
        fs::write(&file, "old").unwrap();

        // Files are fresh, so move "now" far ahead instead of aging them.
        let now = Local::now() + Duration::days(30);
        let report = clean(temp.path(), "sim", now, Duration::hours(12), None, false);

        assert!(report.skipped);
        assert!(file.exists());
    }

    #[test]
    fn test_retention_longer_than_calendar_keeps_everything() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("2026-01-01_sim_a.log");
        fs::write(&file, "old").unwrap();

        let report = clean(
            temp.path(),
            "sim",
            Local::now(),
            Duration::days(100_000_000),
            None,
            false,
        );

        assert_eq!(report, CleanReport::default());
        assert!(file.exists());
    }

    #[test]
    fn test_clean_respects_tag_and_cutoff() {
        let temp = TempDir::new().unwrap();
        let ours = temp.path().join("2026-01-01_sim_a.log");
        let theirs = temp.path().join("2026-01-01_other_a.log");
        let notes = temp.path().join("notes.txt");
        for path in [&ours, &theirs, &notes] {
            fs::write(path, "x").unwrap();
        }

        let now = Local::now() + Duration::days(30);
        let report = clean(temp.path(), "sim", now, Duration::days(7), None, false);

        assert_eq!(report.deleted, 1);
        assert!(!ours.exists());
        assert!(theirs.exists());
        assert!(notes.exists());

        // Files newer than the cutoff survive.
        let fresh = clean(temp.path(), "", Local::now(), Duration::days(7), None, false);
        assert_eq!(fresh.deleted, 0);
        assert!(theirs.exists());
    }

    #[test]
    fn test_clean_all_is_recursive() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("dumps");
        fs::create_dir_all(&nested).unwrap();
        let dump = nested.join("crash.bin");
        fs::write(&dump, "x").unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();

        let now = Local::now() + Duration::days(30);
        let report = clean(temp.path(), "sim", now, Duration::days(7), None, true);

        assert_eq!(report.deleted, 2);
        assert!(!dump.exists());
    }
}
