// src/error.rs

//! Unified error handling for the fund updater.
//!
//! Only run-level failures travel through [`AppError`]. Per-scheme faults are
//! folded into [`crate::models::FetchOutcome`] and never reach the caller.

use std::fmt;

use thiserror::Error;

/// Result type alias for updater operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The master scheme list could not be obtained
    #[error("Master list unavailable: {0}")]
    MasterList(String),

    /// A result sink failed to publish
    #[error("Sink '{sink}' failed: {message}")]
    Sink { sink: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a master list error.
    pub fn master_list(message: impl fmt::Display) -> Self {
        Self::MasterList(message.to_string())
    }

    /// Create a sink error with the sink's name as context.
    pub fn sink(sink: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Sink {
            sink: sink.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_message() {
        let err = AppError::sink("sqlite", "disk full");
        assert_eq!(err.to_string(), "Sink 'sqlite' failed: disk full");
    }

    #[test]
    fn test_master_list_error_message() {
        let err = AppError::master_list("HTTP 503");
        assert_eq!(err.to_string(), "Master list unavailable: HTTP 503");
    }
}
