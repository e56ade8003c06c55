//! This module defines the immutable capture of a single log call.
use chrono::{DateTime, Utc};

use crate::level::Level;

/// An immutable record of one log call.
///
/// Created once by the logger after the level gate has passed and then
/// handed read-only to every effective appender. The first message part is
/// the method name by calling convention; any exception is carried as a
/// pre-formatted string so the event stays cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct LoggingEvent {
    /// Time at which the log call was made.
    pub timestamp: DateTime<Utc>,
    /// Severity of the call.
    pub level: Level,
    /// Name of the originating logger, if any.
    pub logger_name: Option<String>,
    /// Formatted message parts; `message_parts[0]` is the method name.
    pub message_parts: Vec<String>,
    /// Formatted exception passed alongside the message, if any.
    pub exception: Option<String>,
}

impl LoggingEvent {
    /// Creates a new event with the given resolved timestamp.
    pub fn new(
        timestamp: DateTime<Utc>,
        level: Level,
        logger_name: Option<String>,
        message_parts: Vec<String>,
        exception: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            logger_name,
            message_parts,
            exception,
        }
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Seconds since the Unix epoch.
    pub fn timestamp_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }
}
