//! Error types and handling for anisuggest-core operations.
//!
//! Errors are categorized so callers can log them uniformly. Almost nothing in
//! the suggestion pipeline is allowed to surface an error to the input
//! surface: the [`Suggester`](crate::Suggester) converts every failure coming
//! from the network or the store into "no data" and keeps showing the default
//! description. The error type exists for the layers below it and for the
//! CLI, which reports configuration and storage problems.
//!
//! ## Error Categories
//!
//! - **I/O Errors**: durable store file access
//! - **Network Errors**: search endpoint requests
//! - **Parse Errors**: malformed endpoint payloads
//! - **Storage Errors**: key/value store operations
//! - **Configuration Errors**: invalid settings or config files
//! - **Timeouts**: the search endpoint did not answer in time
//!
//! ```rust
//! use anisuggest_core::Error;
//!
//! let err = Error::Timeout("search endpoint".to_string());
//! assert!(err.is_recoverable());
//! assert_eq!(err.category(), "timeout");
//! ```

use thiserror::Error;

/// The main error type for anisuggest-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers reading and writing the durable cache file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    ///
    /// Covers requests to the remote search endpoint. Connection and timeout
    /// errors are recoverable, status and decoding errors are not.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Payload could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Key/value store operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL is malformed or invalid.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Operation timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Check if the error might be recoverable through retry logic.
    ///
    /// Returns `true` for timeouts, connection failures and interrupted I/O.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// Used as a structured field when failures are logged and swallowed.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Timeout(_) => "timeout",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
