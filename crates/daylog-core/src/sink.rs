//! Day-rotated file sink for one logger.
//!
//! Each logger writes to its own file per calendar day:
//! ```text
//! logs/
//! ├── 2026-01-21_sim_Common.log
//! ├── 2026-01-21_sim_Error.log
//! └── 2026-01-21_sim_net.log
//! ```
//! Files are append-only. The first write into a file leads with a header
//! block; failed writes are counted and reported in-band on the next
//! successful one.

use std::fmt::Write as FmtWrite;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::config::HeaderFn;
use crate::error::LogResult;
use crate::guard;
use crate::pending::PendingBuffer;

/// Timestamp format used in lines and headers.
pub const TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S%.3f";

/// File name of a logger's file for `date`.
pub fn file_name(date: NaiveDate, app_tag: &str, logger: &str) -> String {
    if app_tag.is_empty() {
        format!("{}_{}.log", date.format("%Y-%m-%d"), logger)
    } else {
        format!("{}_{}_{}.log", date.format("%Y-%m-%d"), app_tag, logger)
    }
}

/// Append-only destination of one logger, re-resolved when the day changes.
#[derive(Debug)]
pub struct FileSink {
    logger: String,
    day: Option<NaiveDate>,
    dir: PathBuf,
    path: Option<PathBuf>,
    header_written: bool,
    failures: u32,
    last_failure: String,
}

impl FileSink {
    pub fn new(logger: impl Into<String>) -> Self {
        Self {
            logger: logger.into(),
            day: None,
            dir: PathBuf::new(),
            path: None,
            header_written: false,
            failures: 0,
            last_failure: String::new(),
        }
    }

    /// Path of the current day's file, once resolved.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes that failed since the last successful one.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn last_failure(&self) -> &str {
        &self.last_failure
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Make the next successful write lead with a header again.
    pub fn reset_header(&mut self) {
        self.header_written = false;
    }

    /// Whether the next write for `now` under `root` would lead with a header.
    pub fn header_due(&self, root: &Path, now: DateTime<Local>) -> bool {
        self.day != Some(now.date_naive())
            || self.dir.as_path() != root
            || !self.header_written
            || self.path.as_deref().map_or(true, |path| !path.exists())
    }

    /// Resolve the file for `now` under `root` and make sure it exists.
    ///
    /// Returns `true` when the next write must start with a header, i.e. the
    /// file was just created or the header has not been written yet.
    pub fn roll(&mut self, root: &Path, app_tag: &str, now: DateTime<Local>) -> bool {
        let today = now.date_naive();
        if self.day != Some(today) || self.dir.as_path() != root || self.path.is_none() {
            self.day = Some(today);
            self.dir = root.to_path_buf();
            self.path = Some(root.join(file_name(today, app_tag, &self.logger)));
            self.header_written = false;
        }

        if let Err(err) = fs::create_dir_all(root) {
            tracing::debug!(root = %root.display(), error = %err, "could not create log directory");
        }

        if let Some(path) = self.path.as_deref() {
            if !path.exists() {
                // Touched here; the header goes in with the first write.
                if let Err(err) = OpenOptions::new().create(true).append(true).open(path) {
                    tracing::debug!(path = %path.display(), error = %err, "could not create log file");
                }
                self.header_written = false;
            }
        }

        !self.header_written
    }

    /// Append `data`, preceded by the header when due and by everything in
    /// `pending`. `pending` is only cleared when the write succeeds.
    pub fn append<H>(&mut self, data: &str, pending: &mut PendingBuffer, header: H) -> LogResult<()>
    where
        H: FnOnce(&Path) -> String,
    {
        let Some(path) = self.path.clone() else {
            return Err(crate::error::LogError::RootNotConfigured);
        };

        let header_due = !self.header_written;
        let mut out = String::with_capacity(data.len());
        if header_due {
            out.push_str(&header(&path));
        }
        if !pending.is_empty() {
            out.push_str(&pending.joined());
        }
        out.push_str(data);

        match write_all(&path, &out) {
            Ok(()) => {
                self.header_written = true;
                pending.clear();
                if self.failures != 0 {
                    let report = failure_report(self.failures, &self.last_failure);
                    if write_all(&path, &report).is_ok() {
                        self.failures = 0;
                        self.last_failure.clear();
                    }
                }
                Ok(())
            }
            Err(err) => {
                self.failures += 1;
                self.last_failure = format!("{} EX: {}", data.trim_end(), err);
                tracing::warn!(
                    path = %path.display(),
                    failures = self.failures,
                    error = %err,
                    "log write failed"
                );
                Err(err.into())
            }
        }
    }
}

fn write_all(path: &Path, text: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    file.flush()
}

fn failure_report(failures: u32, last: &str) -> String {
    let rule = "!".repeat(47);
    format!(
        "\n{rule}\n{rule}\nWRITING LOGS FAILED {failures} TIMES\nLAST LOG MESSAGE: {last}\n"
    )
}

/// Header block written at the top of every file (and after a header reset).
///
/// `custom` is the text produced by [`custom_header`].
pub fn header_block(logger: &str, path: &Path, now: DateTime<Local>, custom: Option<&str>) -> String {
    let mut out = String::from("\n\n\n\n");
    let _ = writeln!(
        out,
        "!!!!!!!!!!!!!! -----------= LOG STARTS AT: {} =----------- !!!!!!!!!!!!!!",
        now.format(TIME_FORMAT)
    );
    let _ = writeln!(out, "LOG_NAME={}", logger);
    let _ = writeln!(out, "PATH_NAME={}", path.display());
    let _ = writeln!(
        out,
        "DIR_NAME={}",
        std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default()
    );
    let _ = writeln!(out, "APP_NAME={}", process_name());
    let _ = writeln!(
        out,
        "APP_BUILT={}",
        build_time().unwrap_or_else(|| "Could not get build time".to_owned())
    );
    if let Some(custom) = custom {
        let _ = writeln!(out, "{}", custom);
    }

    out.push('\n');
    out
}

/// Run a custom header generator. Must not be called under a logger's write
/// lock: the generator may log.
pub fn custom_header(custom: &HeaderFn, logger: &str) -> String {
    guard::contain(|| custom(logger))
        .unwrap_or_else(|payload| format!("HEADER EXCEPTION: {}", panic_text(payload.as_ref())))
}

fn process_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

fn build_time() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    let modified = fs::metadata(exe).ok()?.modified().ok()?;
    let built: DateTime<Utc> = modified.into();
    Some(format!("{} UTC", built.format("%Y-%m-%d %H:%M:%S")))
}

/// Text of a panic payload.
pub(crate) fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_owned()
    }
}
