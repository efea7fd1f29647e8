//! CLI-specific error types
//!
//! Tracking errors keep their own codes so scripts can branch on
//! `TRACK_NOT_FOUND` and `TRACK_CONFLICT`.

use std::fmt;
use std::io;

use crate::store::StoreError;
use crate::tracking::TrackError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Store file could not be read or written
    StoreFileError,
    /// Async runtime failed to start
    RuntimeFailed,
    /// Tracking operation failed; carries the tracking error code
    Tracking(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "TRACKDB_CLI_CONFIG_ERROR",
            Self::IoError => "TRACKDB_CLI_IO_ERROR",
            Self::StoreFileError => "TRACKDB_CLI_STORE_FILE_ERROR",
            Self::RuntimeFailed => "TRACKDB_CLI_RUNTIME_FAILED",
            Self::Tracking(code) => *code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn store_file_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::StoreFileError, msg)
    }

    pub fn runtime_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::RuntimeFailed, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::store_file_error(e.to_string())
    }
}

impl From<TrackError> for CliError {
    fn from(e: TrackError) -> Self {
        match e {
            TrackError::Config(msg) => Self::config_error(msg),
            other => Self::new(CliErrorCode::Tracking(other.code()), other.to_string()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_codes_pass_through() {
        let err = CliError::from(TrackError::not_found("docs/k"));
        assert_eq!(err.code_str(), "TRACK_NOT_FOUND");

        let err = CliError::from(TrackError::Config("bad suffix".into()));
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }
}
