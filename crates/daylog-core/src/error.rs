//! Error types for Daylog
//!
//! Logging calls never surface these: the write path converts them into
//! failure bookkeeping. They are returned by setup and maintenance code.

use thiserror::Error;

/// Main error type for Daylog operations
#[derive(Error, Debug)]
pub enum LogError {
    /// File system error while creating, writing or scanning log files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An operation needed the log root but none is configured yet
    #[error("Log root is not configured")]
    RootNotConfigured,

    /// Settings file could not be parsed
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// Settings parsed but hold unusable values
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// The process-wide registry was installed twice
    #[error("Logging registry is already installed")]
    AlreadyInstalled,
}

/// Result type alias using LogError
pub type LogResult<T> = Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LogError::InvalidSettings("alphabet is empty".to_string());
        assert_eq!(format!("{}", err), "Invalid settings: alphabet is empty");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let log_err: LogError = io_err.into();
        assert!(matches!(log_err, LogError::Io(_)));
    }
}
