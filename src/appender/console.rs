//! This module provides an appender which mirrors log messages to the
//! process console.
use std::io::Write;

use crate::appender::{Appender, AppenderCore};
use crate::event::LoggingEvent;

/// An appender which writes formatted events to standard error, intended
/// for a developer watching the process.
pub struct ConsoleAppender {
    core: AppenderCore,
}

impl ConsoleAppender {
    /// Creates a new appender with the default pattern layout.
    pub fn new() -> Self {
        Self {
            core: AppenderCore::default(),
        }
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn name(&self) -> &'static str {
        "ConsoleAppender"
    }

    fn core(&self) -> &AppenderCore {
        &self.core
    }

    fn append(&self, event: &LoggingEvent) {
        let mut line = self.layout().format(event);
        if !line.ends_with('\n') {
            line.push('\n');
        }
        if let Some(exception) = &event.exception {
            line.push_str(exception);
            line.push('\n');
        }
        // A failed console write is not worth reporting anywhere.
        let _ = std::io::stderr().write_all(line.as_bytes());
    }
}
