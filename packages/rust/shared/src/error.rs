//! Error types for Broadsheet.
//!
//! Library crates use [`BroadsheetError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Broadsheet operations.
///
/// Every variant is fatal to a run. Per-record problems are not errors; the
/// classifier reports them as skips.
#[derive(Debug, thiserror::Error)]
pub enum BroadsheetError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the content API or a reference page.
    #[error("network error: {0}")]
    Network(String),

    /// The content API answered, but not with the expected shape or status.
    #[error("API error: {message}")]
    Api { message: String },

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The current edition could not be determined.
    #[error("edition error: {message}")]
    Edition { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Another pipeline instance holds the archive lock.
    #[error(
        "lockfile found ({path:?}): an instance is already running as process {pid}"
    )]
    Locked { pid: u32, path: PathBuf },

    /// Article rendering error.
    #[error("render error: {0}")]
    Render(String),

    /// Data validation error (manifest shape, invalid values, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BroadsheetError>;

impl BroadsheetError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an API response error.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create an edition resolution error.
    pub fn edition(msg: impl Into<String>) -> Self {
        Self::Edition {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BroadsheetError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = BroadsheetError::api("The API returned the status 'error'");
        assert!(err.to_string().contains("status 'error'"));
    }

    #[test]
    fn locked_error_names_pid() {
        let err = BroadsheetError::Locked {
            pid: 4242,
            path: PathBuf::from("/tmp/archive/lock.pid"),
        };
        let msg = err.to_string();
        assert!(msg.contains("4242"));
        assert!(msg.contains("lock.pid"));
    }
}
