//! Process-wide registry of named loggers.
//!
//! Names are case-insensitive: `"Net"` and `"net"` resolve to the same
//! [`Logger`]. A registry is cheap to clone; clones share their loggers.

use std::collections::HashMap;
use std::fmt;
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local, NaiveDate};
use parking_lot::Mutex;

use crate::call_site::CallSite;
use crate::clock::{Clock, SystemClock};
use crate::config::LogConfig;
use crate::error::{LogError, LogResult};
use crate::governor::SizeGovernor;
use crate::guard;
use crate::level::Level;
use crate::logger::Logger;
use crate::maintenance::{self, CleanReport};
use crate::sink;

/// Logger used for blank names.
pub const COMMON: &str = "Common";
/// Logger every error line is mirrored into.
pub const ERROR: &str = "Error";
/// Logger receiving panics once [`Registry::hook_panics`] is installed.
pub const UNHANDLED: &str = "unhandled";

const PANIC_LOCK_WAIT: StdDuration = StdDuration::from_millis(100);

/// State every logger of a registry reads on its write path.
pub(crate) struct Runtime {
    pub(crate) config: Arc<LogConfig>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) governor: SizeGovernor,
}

pub(crate) struct Shared {
    runtime: Arc<Runtime>,
    loggers: Mutex<HashMap<String, Arc<Logger>>>,
}

impl Shared {
    pub(crate) fn get(self: &Arc<Self>, name: &str) -> Arc<Logger> {
        let name = normalize_name(name);
        let key = name.to_lowercase();

        let mut loggers = self.loggers.lock();
        if let Some(logger) = loggers.get(&key) {
            return logger.clone();
        }

        tracing::debug!(logger = %name, "creating logger");
        let logger = Arc::new(Logger::new(
            name,
            self.runtime.clone(),
            Arc::downgrade(self),
        ));
        loggers.insert(key, logger.clone());
        logger
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Logger>> {
        self.loggers.lock().values().cloned().collect()
    }
}

/// Hands out one [`Logger`] per name.
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
}

impl Registry {
    pub fn new(config: LogConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Registry reading time from `clock`.
    pub fn with_clock(config: LogConfig, clock: Arc<dyn Clock>) -> Self {
        let runtime = Runtime {
            config: Arc::new(config),
            clock,
            governor: SizeGovernor::new(),
        };
        Self {
            shared: Arc::new(Shared {
                runtime: Arc::new(runtime),
                loggers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The logger named `name`, created on first use.
    pub fn get(&self, name: &str) -> Arc<Logger> {
        self.shared.get(name)
    }

    pub fn error_logger(&self) -> Arc<Logger> {
        self.get(ERROR)
    }

    pub fn config(&self) -> &LogConfig {
        &self.shared.runtime.config
    }

    pub fn now(&self) -> DateTime<Local> {
        self.shared.runtime.clock.now()
    }

    /// Every logger created so far, in no particular order.
    pub fn loggers(&self) -> Vec<Arc<Logger>> {
        self.shared.snapshot()
    }

    /// Whether the daily size budget currently suppresses logging.
    pub fn is_limited(&self) -> bool {
        self.shared.runtime.governor.is_limited()
    }

    /// Log files of `date` under the configured root.
    pub fn log_files_for(&self, date: NaiveDate) -> Vec<PathBuf> {
        self.config()
            .root()
            .map(|root| maintenance::log_files_for(&root, date))
            .unwrap_or_default()
    }

    pub fn day_usage(&self, date: NaiveDate) -> u64 {
        self.config()
            .root()
            .map(|root| maintenance::day_usage(&root, date))
            .unwrap_or(0)
    }

    /// Delete files under the root older than `retention`.
    pub fn clean(&self, retention: Duration, reporter: Option<&Logger>, clean_all: bool) -> CleanReport {
        let Some(root) = self.config().root() else {
            tracing::debug!("log root not configured, nothing to clean");
            return CleanReport::default();
        };
        maintenance::clean(
            &root,
            &self.config().app_tag(),
            self.now(),
            retention,
            reporter,
            clean_all,
        )
    }

    /// Write panics to the `unhandled` logger before the previous hook runs.
    pub fn hook_panics(&self) {
        let registry = self.clone();
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            // Caught by the logger itself and replaced with fallback text.
            if guard::active() {
                previous(info);
                return;
            }
            let text = sink::panic_text(info.payload());
            let (file, line) = info
                .location()
                .map(|location| (location.file(), location.line()))
                .unwrap_or(("unknown", 0));

            // The panicking thread may hold a write lock; never wait on it for long.
            registry
                .get(UNHANDLED)
                .event(Level::Error, CallSite::new(file, "panic", line))
                .error_message(&text)
                .wait_at_most(PANIC_LOCK_WAIT)
                .log("Unhandled panic occurred!");

            previous(info);
        }));
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", self.config())
            .field("loggers", &self.shared.loggers.lock().len())
            .finish()
    }
}

/// Canonical logger name: trimmed, blank becomes [`COMMON`], characters
/// invalid in file names become `$`.
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return COMMON.to_owned();
    }
    trimmed
        .chars()
        .map(|c| if is_invalid_file_char(c) { '$' } else { c })
        .collect()
}

fn is_invalid_file_char(c: char) -> bool {
    c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Install the process-wide registry. Fails if one is already in place.
pub fn install(config: LogConfig) -> LogResult<&'static Registry> {
    let mut config = Some(config);
    let registry = GLOBAL.get_or_init(|| {
        Registry::new(config.take().unwrap_or_else(|| LogConfig::builder().build()))
    });
    match config {
        Some(_) => Err(LogError::AlreadyInstalled),
        None => Ok(registry),
    }
}

/// The process-wide registry, created with defaults if none was installed.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(|| Registry::new(LogConfig::builder().build()))
}

/// Shorthand for `global().get(name)`.
pub fn get(name: &str) -> Arc<Logger> {
    global().get(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(LogConfig::builder().app_tag("sim").build())
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(""), "Common");
        assert_eq!(normalize_name("   "), "Common");
        assert_eq!(normalize_name(" net "), "net");
        assert_eq!(normalize_name("a/b:c*"), "a$b$c$");
        assert_eq!(normalize_name("tab\there"), "tab$here");
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let registry = registry();
        let a = registry.get("Net");
        let b = registry.get("net");

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "Net");
        assert_eq!(registry.loggers().len(), 1);
    }

    #[test]
    fn test_blank_name_is_common() {
        let registry = registry();
        assert!(Arc::ptr_eq(&registry.get(""), &registry.get("common")));
    }

    #[test]
    fn test_clones_share_loggers() {
        let registry = registry();
        let clone = registry.clone();
        assert!(Arc::ptr_eq(&registry.get("x"), &clone.get("X")));
    }

    #[test]
    fn test_error_logger_is_recognised() {
        let registry = registry();
        assert!(registry.error_logger().is_error_logger());
        assert!(!registry.get("net").is_error_logger());
    }

    #[test]
    fn test_clean_without_root_does_nothing() {
        let report = registry().clean(Duration::days(7), None, true);
        assert_eq!(report, CleanReport::default());
    }
}
