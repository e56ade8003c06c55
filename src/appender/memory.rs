//! This module provides an appender which keeps log messages in a bounded
//! in-process buffer.
//!
//! The buffer is the data source for log viewers, which subscribe to the
//! change notification to refresh their display.
use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::appender::{Appender, AppenderCore};
use crate::event::LoggingEvent;
use crate::types::{LogMessage, LogMessagesChanged};

/// Default capacity of the buffer.
const MAX_MESSAGES_DEFAULT: usize = 250;

/// An appender which stores log messages in memory, evicting the oldest
/// message once full.
pub struct MemoryAppender {
    core: AppenderCore,
    max_messages: Mutex<usize>,
    messages: Mutex<VecDeque<LogMessage>>,
    changed_sender: Mutex<Option<mpsc::UnboundedSender<LogMessagesChanged>>>,
}

impl MemoryAppender {
    /// Creates a new appender with the default capacity of 250 messages.
    pub fn new() -> Self {
        Self {
            core: AppenderCore::default(),
            max_messages: Mutex::new(MAX_MESSAGES_DEFAULT),
            messages: Mutex::new(VecDeque::new()),
            changed_sender: Mutex::new(None),
        }
    }

    /// Sets the sender notified after every append and every removal.
    ///
    /// The notification fires exactly once per state-changing operation and
    /// never for events rejected by the threshold.
    pub fn set_changed_sender(&self, sender: mpsc::UnboundedSender<LogMessagesChanged>) {
        *self.changed_sender.lock().unwrap() = Some(sender);
    }

    /// Returns a snapshot of the stored messages, oldest first.
    pub fn get_log_messages(&self) -> Vec<LogMessage> {
        self.messages.lock().unwrap().iter().cloned().collect()
    }

    /// Returns the current capacity.
    pub fn max_messages(&self) -> usize {
        *self.max_messages.lock().unwrap()
    }

    /// Changes the capacity. Shrinking below the current length trims the
    /// oldest messages immediately. Values below 1 are clamped to 1 so the
    /// eviction loop in `append` always terminates.
    pub fn set_max_messages(&self, max_messages: usize) {
        let max_messages = max_messages.max(1);
        let mut current = self.max_messages.lock().unwrap();
        if *current == max_messages {
            return;
        }
        *current = max_messages;
        let mut messages = self.messages.lock().unwrap();
        while messages.len() > max_messages {
            messages.pop_front();
        }
    }

    /// Removes all stored messages.
    pub fn remove_log_messages(&self) {
        self.messages.lock().unwrap().clear();
        self.notify(LogMessagesChanged::Cleared);
    }

    fn notify(&self, change: LogMessagesChanged) {
        if let Some(sender) = self.changed_sender.lock().unwrap().as_ref() {
            let _ = sender.send(change);
        }
    }
}

impl Default for MemoryAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for MemoryAppender {
    fn name(&self) -> &'static str {
        "MemoryAppender"
    }

    fn core(&self) -> &AppenderCore {
        &self.core
    }

    fn append(&self, event: &LoggingEvent) {
        let message = LogMessage::from_event(event);
        {
            let max = *self.max_messages.lock().unwrap();
            let mut messages = self.messages.lock().unwrap();
            while messages.len() >= max {
                messages.pop_front();
            }
            messages.push_back(message.clone());
        }
        self.notify(LogMessagesChanged::Appended(message));
    }
}
