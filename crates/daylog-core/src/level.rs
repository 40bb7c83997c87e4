//! Trace levels and their three-letter tags.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LogError;

/// Severity of a log line. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// High-volume diagnostics
    Trace = 0,
    /// Normal operational messages
    Info = 1,
    /// Expected problems that can be ignored
    #[serde(alias = "warn")]
    Warning = 2,
    /// Problems that can't be ignored; mirrored into the shared `Error` logger
    Error = 3,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Trace, Level::Info, Level::Warning, Level::Error];

    /// Three-letter tag leading every formatted line.
    pub fn tag(self) -> &'static str {
        match self {
            Level::Trace => "TRC",
            Level::Info => "INF",
            Level::Warning => "WRN",
            Level::Error => "ERR",
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Level {
        match raw {
            0 => Level::Trace,
            1 => Level::Info,
            2 => Level::Warning,
            _ => Level::Error,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" | "trc" => Ok(Level::Trace),
            "info" | "inf" => Ok(Level::Info),
            "warn" | "warning" | "wrn" => Ok(Level::Warning),
            "error" | "err" => Ok(Level::Error),
            other => Err(LogError::InvalidSettings(format!("unknown level '{}'", other))),
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warning,
            tracing::Level::INFO => Level::Info,
            _ => Level::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(Level::Trace < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
    }

    #[test]
    fn test_parse_accepts_tags_and_names() {
        assert_eq!("WRN".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(" Error ".parse::<Level>().unwrap(), Level::Error);
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_u8_roundtrip() {
        for level in Level::ALL {
            assert_eq!(Level::from_u8(level as u8), level);
        }
    }

    #[test]
    fn test_from_tracing_level() {
        assert_eq!(Level::from(&tracing::Level::DEBUG), Level::Trace);
        assert_eq!(Level::from(&tracing::Level::WARN), Level::Warning);
    }
}
