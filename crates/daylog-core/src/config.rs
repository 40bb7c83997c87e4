//! Process-wide logging configuration.
//!
//! A [`LogConfig`] is built once at startup with [`LogConfigBuilder`] and shared
//! by every logger of a [`Registry`](crate::Registry). Flags read on every write
//! are atomics loaded with relaxed ordering: a writer may see a value that is
//! stale by one size-check interval, which is accepted.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Duration;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::{LogError, LogResult};
use crate::level::Level;

/// Symbols handed out to repeated messages, in order of preference.
pub const DEFAULT_ALPHABET: &str = "*#xo+@$vABCDEF";

/// Lines kept while no log root is configured.
pub const DEFAULT_PENDING_CAPACITY: usize = 100;

/// Longest accepted size check interval or cache window, in seconds.
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

fn window(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_WINDOW_SECS) as i64)
}

fn clamp_window(window: Duration) -> Duration {
    window.min(Duration::seconds(MAX_WINDOW_SECS as i64))
}

/// Produces extra header text for a logger, given its name.
pub type HeaderFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Values fixed when the configuration is built.
#[derive(Debug, Clone)]
pub struct Tunables {
    /// How often the daily size budget is re-evaluated
    pub size_check_interval: Duration,

    /// A repeated message is fully rendered again after this long
    pub repeat_window: Duration,

    /// An untouched placeholder is forgotten after this long
    pub removal_window: Duration,

    /// Placeholder symbols
    pub alphabet: Vec<char>,

    /// Capacity of each logger's pending buffer
    pub pending_capacity: usize,

    /// Stack signature threshold for new loggers (`None` = never)
    pub stack_level: Option<Level>,

    /// Thread-affinity flag for new loggers
    pub thread_affinity: bool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            size_check_interval: Duration::minutes(5),
            repeat_window: Duration::minutes(10),
            removal_window: Duration::minutes(1),
            alphabet: DEFAULT_ALPHABET.chars().collect(),
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            stack_level: Some(Level::Error),
            thread_affinity: true,
        }
    }
}

/// Shared configuration read by every write path.
pub struct LogConfig {
    root: RwLock<Option<PathBuf>>,
    app_tag: RwLock<String>,
    header: RwLock<Option<HeaderFn>>,
    enabled: AtomicBool,
    daily_budget: AtomicI64,
    min_level: AtomicU8,
    optimizations_disabled: AtomicBool,
    tunables: Tunables,
}

impl LogConfig {
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }

    /// Directory holding the log files; `None` until configured.
    pub fn root(&self) -> Option<PathBuf> {
        self.root.read().clone()
    }

    pub fn set_root(&self, root: Option<PathBuf>) {
        *self.root.write() = root;
    }

    /// Tag placed between the date and the logger name in file names.
    pub fn app_tag(&self) -> String {
        self.app_tag.read().clone()
    }

    pub fn set_app_tag(&self, tag: impl Into<String>) {
        *self.app_tag.write() = tag.into();
    }

    pub fn header(&self) -> Option<HeaderFn> {
        self.header.read().clone()
    }

    pub fn set_header<F>(&self, header: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        *self.header.write() = Some(Arc::new(header));
    }

    pub fn clear_header(&self) {
        *self.header.write() = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Daily byte budget across all log files; zero or less means unlimited.
    pub fn daily_budget(&self) -> i64 {
        self.daily_budget.load(Ordering::Relaxed)
    }

    pub fn set_daily_budget(&self, bytes: i64) {
        self.daily_budget.store(bytes, Ordering::Relaxed);
    }

    /// Lowest level any logger emits.
    pub fn min_level(&self) -> Level {
        Level::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    pub fn set_min_level(&self, level: Level) {
        self.min_level.store(level as u8, Ordering::Relaxed);
    }

    /// When set, optimized traces are written as plain lines.
    pub fn optimizations_disabled(&self) -> bool {
        self.optimizations_disabled.load(Ordering::Relaxed)
    }

    pub fn set_optimizations_disabled(&self, disabled: bool) {
        self.optimizations_disabled.store(disabled, Ordering::Relaxed);
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }
}

impl std::fmt::Debug for LogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogConfig")
            .field("root", &self.root())
            .field("app_tag", &self.app_tag())
            .field("enabled", &self.is_enabled())
            .field("daily_budget", &self.daily_budget())
            .field("min_level", &self.min_level())
            .field("has_header", &self.header.read().is_some())
            .field("tunables", &self.tunables)
            .finish()
    }
}

/// Builder for [`LogConfig`].
pub struct LogConfigBuilder {
    root: Option<PathBuf>,
    app_tag: Option<String>,
    header: Option<HeaderFn>,
    enabled: bool,
    daily_budget: i64,
    min_level: Level,
    optimizations_disabled: bool,
    tunables: Tunables,
}

impl Default for LogConfigBuilder {
    fn default() -> Self {
        Self {
            root: None,
            app_tag: None,
            header: None,
            enabled: true,
            daily_budget: 0,
            min_level: Level::Trace,
            optimizations_disabled: false,
            tunables: Tunables::default(),
        }
    }
}

impl LogConfigBuilder {
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Application tag; defaults to the executable's file stem.
    pub fn app_tag(mut self, tag: impl Into<String>) -> Self {
        self.app_tag = Some(tag.into());
        self
    }

    pub fn header<F>(mut self, header: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.header = Some(Arc::new(header));
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn daily_budget(mut self, bytes: i64) -> Self {
        self.daily_budget = bytes;
        self
    }

    pub fn min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn disable_optimizations(mut self, disabled: bool) -> Self {
        self.optimizations_disabled = disabled;
        self
    }

    pub fn size_check_interval(mut self, interval: Duration) -> Self {
        self.tunables.size_check_interval = clamp_window(interval.max(Duration::seconds(1)));
        self
    }

    pub fn repeat_window(mut self, window: Duration) -> Self {
        self.tunables.repeat_window = clamp_window(window);
        self
    }

    pub fn removal_window(mut self, window: Duration) -> Self {
        self.tunables.removal_window = clamp_window(window);
        self
    }

    /// Placeholder symbols. Duplicates are dropped; an empty alphabet keeps the default.
    pub fn alphabet(mut self, symbols: &str) -> Self {
        let mut alphabet: Vec<char> = Vec::new();
        for symbol in symbols.chars() {
            if !alphabet.contains(&symbol) {
                alphabet.push(symbol);
            }
        }
        if !alphabet.is_empty() {
            self.tunables.alphabet = alphabet;
        }
        self
    }

    pub fn pending_capacity(mut self, capacity: usize) -> Self {
        self.tunables.pending_capacity = capacity.max(1);
        self
    }

    pub fn stack_level(mut self, level: Option<Level>) -> Self {
        self.tunables.stack_level = level;
        self
    }

    pub fn thread_affinity(mut self, enabled: bool) -> Self {
        self.tunables.thread_affinity = enabled;
        self
    }

    /// Apply every value present in `settings`.
    pub fn settings(mut self, settings: Settings) -> Self {
        if let Some(root) = settings.root {
            self = self.root(root);
        }
        if let Some(tag) = settings.app_tag {
            self = self.app_tag(tag);
        }
        if let Some(enabled) = settings.enabled {
            self = self.enabled(enabled);
        }
        if let Some(budget) = settings.daily_budget_bytes {
            self = self.daily_budget(budget);
        }
        if let Some(level) = settings.min_level {
            self = self.min_level(level);
        }
        if settings.disable_stack_traces == Some(true) {
            self = self.stack_level(None);
        } else if let Some(level) = settings.stack_level {
            self = self.stack_level(Some(level));
        }
        if let Some(affinity) = settings.thread_affinity {
            self = self.thread_affinity(affinity);
        }
        if let Some(disabled) = settings.disable_optimizations {
            self = self.disable_optimizations(disabled);
        }
        if let Some(secs) = settings.size_check_interval_secs {
            self = self.size_check_interval(window(secs));
        }
        if let Some(secs) = settings.repeat_window_secs {
            self = self.repeat_window(window(secs));
        }
        if let Some(secs) = settings.removal_window_secs {
            self = self.removal_window(window(secs));
        }
        if let Some(capacity) = settings.pending_capacity {
            self = self.pending_capacity(capacity);
        }
        if let Some(alphabet) = settings.alphabet {
            self = self.alphabet(&alphabet);
        }
        self
    }

    pub fn build(self) -> LogConfig {
        let app_tag = self.app_tag.unwrap_or_else(default_app_tag);
        LogConfig {
            root: RwLock::new(self.root),
            app_tag: RwLock::new(app_tag),
            header: RwLock::new(self.header),
            enabled: AtomicBool::new(self.enabled),
            daily_budget: AtomicI64::new(self.daily_budget),
            min_level: AtomicU8::new(self.min_level as u8),
            optimizations_disabled: AtomicBool::new(self.optimizations_disabled),
            tunables: self.tunables,
        }
    }
}

fn default_app_tag() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

/// Configuration as read from a JSON settings file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub root: Option<PathBuf>,
    pub app_tag: Option<String>,
    pub enabled: Option<bool>,
    pub daily_budget_bytes: Option<i64>,
    pub min_level: Option<Level>,
    pub stack_level: Option<Level>,
    pub disable_stack_traces: Option<bool>,
    pub thread_affinity: Option<bool>,
    pub disable_optimizations: Option<bool>,
    pub size_check_interval_secs: Option<u64>,
    pub repeat_window_secs: Option<u64>,
    pub removal_window_secs: Option<u64>,
    pub pending_capacity: Option<usize>,
    pub alphabet: Option<String>,
}

impl Settings {
    pub fn from_json(json: &str) -> LogResult<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> LogResult<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded logging settings");
        Ok(settings)
    }

    fn validate(&self) -> LogResult<()> {
        if matches!(&self.alphabet, Some(alphabet) if alphabet.is_empty()) {
            return Err(LogError::InvalidSettings("alphabet is empty".into()));
        }
        if self.pending_capacity == Some(0) {
            return Err(LogError::InvalidSettings(
                "pending_capacity must be at least 1".into(),
            ));
        }
        if self.size_check_interval_secs == Some(0) {
            return Err(LogError::InvalidSettings(
                "size_check_interval_secs must be at least 1".into(),
            ));
        }
        for (field, secs) in [
            ("size_check_interval_secs", self.size_check_interval_secs),
            ("repeat_window_secs", self.repeat_window_secs),
            ("removal_window_secs", self.removal_window_secs),
        ] {
            if matches!(secs, Some(secs) if secs > MAX_WINDOW_SECS) {
                return Err(LogError::InvalidSettings(format!(
                    "{} must be at most {}",
                    field, MAX_WINDOW_SECS
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = LogConfig::builder().app_tag("sim").build();

        assert!(config.root().is_none());
        assert!(config.is_enabled());
        assert_eq!(config.daily_budget(), 0);
        assert_eq!(config.min_level(), Level::Trace);
        assert_eq!(config.tunables().alphabet.len(), DEFAULT_ALPHABET.len());
        assert_eq!(config.tunables().repeat_window, Duration::minutes(10));
        assert_eq!(config.tunables().removal_window, Duration::minutes(1));
        assert_eq!(config.tunables().size_check_interval, Duration::minutes(5));
    }

    #[test]
    fn test_alphabet_drops_duplicates() {
        let config = LogConfig::builder().alphabet("aab").build();
        assert_eq!(config.tunables().alphabet, vec!['a', 'b']);
    }

    #[test]
    fn test_runtime_setters() {
        let config = LogConfig::builder().build();
        config.set_root(Some(PathBuf::from("/tmp/logs")));
        config.set_enabled(false);
        config.set_min_level(Level::Warning);
        config.set_daily_budget(1024);

        assert_eq!(config.root(), Some(PathBuf::from("/tmp/logs")));
        assert!(!config.is_enabled());
        assert_eq!(config.min_level(), Level::Warning);
        assert_eq!(config.daily_budget(), 1024);
    }

    #[test]
    fn test_settings_apply_over_builder() {
        let settings = Settings::from_json(
            r#"{
                "root": "/var/log/sim",
                "app_tag": "sim",
                "daily_budget_bytes": 4096,
                "min_level": "warn",
                "disable_stack_traces": true,
                "repeat_window_secs": 30
            }"#,
        )
        .unwrap();

        let config = LogConfig::builder().settings(settings).build();
        assert_eq!(config.root(), Some(PathBuf::from("/var/log/sim")));
        assert_eq!(config.app_tag(), "sim");
        assert_eq!(config.daily_budget(), 4096);
        assert_eq!(config.min_level(), Level::Warning);
        assert_eq!(config.tunables().stack_level, None);
        assert_eq!(config.tunables().repeat_window, Duration::seconds(30));
    }

    #[test]
    fn test_settings_reject_unknown_and_invalid() {
        assert!(matches!(
            Settings::from_json(r#"{"colour": "red"}"#),
            Err(LogError::Settings(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{"alphabet": ""}"#),
            Err(LogError::InvalidSettings(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{"pending_capacity": 0}"#),
            Err(LogError::InvalidSettings(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{"size_check_interval_secs": 1000000000000000}"#),
            Err(LogError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_huge_windows_are_clamped() {
        let settings = Settings {
            size_check_interval_secs: Some(u64::MAX),
            repeat_window_secs: Some(u64::MAX),
            removal_window_secs: Some(1_000_000_000_000_000),
            ..Settings::default()
        };
        let config = LogConfig::builder().settings(settings).build();

        let longest = Duration::seconds(MAX_WINDOW_SECS as i64);
        assert_eq!(config.tunables().size_check_interval, longest);
        assert_eq!(config.tunables().repeat_window, longest);
        assert_eq!(config.tunables().removal_window, longest);
    }
}
