//! This module implements the JSON-based layout.
use serde_json::{json, Value};

use crate::event::LoggingEvent;
use crate::layout::Layout;

/// A layout which formats events as a JSON object with the fixed keys
/// `logger`, `timestamp`, `level`, `url` and `message`.
///
/// Serialization goes through `serde_json`, so quote characters embedded in
/// message text are escaped exactly once and the output always parses back
/// to the original strings.
pub struct JsonLayout {
    combine_messages: bool,
    url: Option<String>,
}

impl JsonLayout {
    /// Creates a new layout.
    ///
    /// # Arguments
    ///
    /// * `combine_messages` - If `true`, the message parts are joined into
    ///   a single string; otherwise they are emitted as an array.
    pub fn new(combine_messages: bool) -> Self {
        Self {
            combine_messages,
            url: None,
        }
    }

    /// Sets a static source identifier emitted in the `url` field.
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Formats the event as a JSON value rather than a string, the object
    /// form of what [`Layout::format`] serializes.
    pub fn format_value(&self, event: &LoggingEvent) -> Value {
        let message = if self.combine_messages {
            Value::String(event.message_parts.join(" "))
        } else {
            json!(event.message_parts)
        };
        json!({
            "logger": event.logger_name,
            "timestamp": event.timestamp_millis(),
            "level": event.level.name(),
            "url": self.url,
            "message": message,
        })
    }
}

impl Layout for JsonLayout {
    fn format(&self, event: &LoggingEvent) -> String {
        self.format_value(event).to_string()
    }
}
