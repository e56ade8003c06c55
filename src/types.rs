use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::LoggingEvent;

/// The serializable projection of a logging event which sinks store and
/// viewers display.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogMessage {
    pub time_stamp: DateTime<Utc>,
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    pub method_name: String,
    pub message: Vec<String>,
}

impl LogMessage {
    /// Projects a `LoggingEvent` into its stored form: the first message
    /// part becomes `method_name`, the rest become `message`.
    pub fn from_event(event: &LoggingEvent) -> Self {
        let mut parts = event.message_parts.iter();
        let method_name = parts.next().cloned().unwrap_or_default();
        Self {
            time_stamp: event.timestamp,
            level: event.level.name().to_string(),
            logger: event.logger_name.clone(),
            method_name,
            message: parts.cloned().collect(),
        }
    }
}

/// Notification emitted by message-storing sinks after every state change.
#[derive(Debug, Clone)]
pub enum LogMessagesChanged {
    /// A message was appended to the sink.
    Appended(LogMessage),
    /// The sink's messages were removed.
    Cleared,
}
