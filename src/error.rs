//! Error type shared by every screenlet operation.
//!
//! Transport failures, server-reported errors and response-shape errors all
//! travel through this one type so that interactors expose a single failure
//! channel to their screenlet.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced to failure handlers and delegates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScreenletError {
    /// Failed to reach the server
    #[error("Connection failed: {0}")]
    Transport(String),

    /// Request exceeded its timeout
    #[error("Request timed out")]
    Timeout,

    /// Server answered with an error status or an exception body
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    /// Response did not have the expected shape
    #[error("Unexpected response: {0}")]
    Deserialize(String),

    /// Operation could not be built from the current screenlet state
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Cache-only read found nothing
    #[error("No cached value for '{key}'")]
    CacheMiss { key: String },

    /// Operation was cancelled before completing
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ScreenletError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScreenletError::Timeout
        } else if err.is_decode() {
            ScreenletError::Deserialize(err.to_string())
        } else {
            ScreenletError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ScreenletError {
    fn from(err: serde_json::Error) -> Self {
        ScreenletError::Deserialize(err.to_string())
    }
}

impl From<ConfigError> for ScreenletError {
    fn from(err: ConfigError) -> Self {
        ScreenletError::Config(err.to_string())
    }
}

impl ScreenletError {
    /// Short machine-readable error kind.
    pub fn error_type(&self) -> &'static str {
        match self {
            ScreenletError::Transport(_) => "transport_error",
            ScreenletError::Timeout => "timeout",
            ScreenletError::Server { .. } => "server_error",
            ScreenletError::Deserialize(_) => "deserialize_error",
            ScreenletError::InvalidInput(_) => "invalid_input",
            ScreenletError::CacheMiss { .. } => "cache_miss",
            ScreenletError::Cancelled => "cancelled",
            ScreenletError::Config(_) => "config_error",
        }
    }

    /// Whether the server was never reached (cache fallback applies).
    pub fn is_transport(&self) -> bool {
        matches!(self, ScreenletError::Transport(_) | ScreenletError::Timeout)
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        ScreenletError::Deserialize(message.into())
    }
}
