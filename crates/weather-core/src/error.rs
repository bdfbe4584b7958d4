//! Error types for weather cache operations.
//!
//! This module defines [`WeatherError`] which covers all error cases that can occur
//! when fetching, parsing, filtering, or persisting weather observations.

use thiserror::Error;

/// Errors that can occur while filling or reading the weather cache.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// The remote source answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Http {
        /// Status code returned by the server.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// The response body was neither JSON nor text.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Error parsing data from a source or a stored blob.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the persistent store.
    #[error("Store error: {0}")]
    Store(String),

    /// A date key or calendar date could not be interpreted.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`WeatherError`].
pub type Result<T> = std::result::Result<T, WeatherError>;
