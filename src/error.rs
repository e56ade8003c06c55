//! This module defines the error types used throughout the crate.
use thiserror::Error;

/// Errors raised by configuration and storage operations.
///
/// Delivery failures of the remote appender are deliberately *not* part of
/// this taxonomy; they are reported through the failure notification channel
/// and never surface as an error on a logging call.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A required configuration field is missing or empty.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A log level name could not be parsed.
    #[error("invalid log level {0}")]
    InvalidLogLevel(String),

    /// An attempt was made to change a field which is immutable after
    /// construction (ajax URL, storage key, credentials mode).
    #[error("{field}: changing the value while running is not supported")]
    ImmutableField {
        /// Name of the offending configuration field.
        field: &'static str,
    },

    /// The persistent store reported an error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Persisted log messages could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
