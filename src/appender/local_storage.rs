//! This module provides an appender which persists log messages to a local
//! key-value store, so they survive application restarts.
//!
//! Messages are stored JSON-serialized as one array per storage key. Every
//! mutation rewrites the full array; there is no incremental persistence.
use std::collections::VecDeque;
use std::sync::Mutex;

use sled::Db;

use crate::appender::{Appender, AppenderCore};
use crate::error::LoggingError;
use crate::event::LoggingEvent;
use crate::level::Level;
use crate::types::LogMessage;

/// Default capacity of the buffer.
const MAX_MESSAGES_DEFAULT: usize = 250;

/// Name of the sled tree holding all storage keys.
pub(crate) const STORAGE_TREE: &str = "log_messages";

/// An appender which mirrors a bounded message buffer into the local
/// key-value store under a fixed storage key.
///
/// The in-memory buffer is authoritative; the stored value is rewritten on
/// every mutation. The storage key is immutable after construction.
pub struct LocalStorageAppender {
    core: AppenderCore,
    tree: sled::Tree,
    storage_key: String,
    max_messages: Mutex<usize>,
    messages: Mutex<VecDeque<LogMessage>>,
}

impl LocalStorageAppender {
    /// Creates a new appender and replays any messages already persisted
    /// under `storage_key`.
    ///
    /// The threshold defaults to `Warn`. Unparseable persisted data is
    /// discarded with a warning.
    ///
    /// # Errors
    ///
    /// Returns `LoggingError::InvalidConfiguration` if `storage_key` is
    /// empty, or a storage error if the tree cannot be opened.
    pub fn new(db: &Db, storage_key: &str) -> Result<Self, LoggingError> {
        if storage_key.is_empty() {
            return Err(LoggingError::InvalidConfiguration(
                "localStorageKey may not be empty".to_string(),
            ));
        }
        let tree = db.open_tree(STORAGE_TREE)?;

        let messages = match tree.get(storage_key.as_bytes())? {
            Some(raw) => match serde_json::from_slice::<Vec<LogMessage>>(&raw) {
                Ok(stored) => stored.into(),
                Err(error) => {
                    tracing::warn!(%storage_key, %error, "discarding unparseable persisted log messages");
                    VecDeque::new()
                }
            },
            None => VecDeque::new(),
        };

        let appender = Self {
            core: AppenderCore::default(),
            tree,
            storage_key: storage_key.to_string(),
            max_messages: Mutex::new(MAX_MESSAGES_DEFAULT),
            messages: Mutex::new(messages),
        };
        appender.set_threshold(Level::Warn);
        Ok(appender)
    }

    /// Returns the storage key this appender writes to.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
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
    /// oldest messages and rewrites the stored array immediately. Values
    /// below 1 are clamped to 1 so the eviction loop in `append` always
    /// terminates.
    pub fn set_max_messages(&self, max_messages: usize) {
        let max_messages = max_messages.max(1);
        let mut current = self.max_messages.lock().unwrap();
        if *current == max_messages {
            return;
        }
        *current = max_messages;
        let mut messages = self.messages.lock().unwrap();
        if messages.len() > max_messages {
            while messages.len() > max_messages {
                messages.pop_front();
            }
            self.persist(&messages);
        }
    }

    /// Removes all messages and deletes the storage key, so a later read
    /// sees no prior messages rather than an empty array.
    pub fn clear_log(&self) {
        self.messages.lock().unwrap().clear();
        if let Err(error) = self.tree.remove(self.storage_key.as_bytes()) {
            tracing::error!(storage_key = %self.storage_key, %error, "failed to remove persisted log messages");
        }
    }

    /// Reads the messages persisted under `storage_key` without
    /// constructing an appender.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the persisted value
    /// is not a valid message array.
    pub fn load_log_messages(db: &Db, storage_key: &str) -> Result<Vec<LogMessage>, LoggingError> {
        let tree = db.open_tree(STORAGE_TREE)?;
        match tree.get(storage_key.as_bytes())? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Deletes the messages persisted under `storage_key` without
    /// constructing an appender.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn remove_log_messages(db: &Db, storage_key: &str) -> Result<(), LoggingError> {
        let tree = db.open_tree(STORAGE_TREE)?;
        tree.remove(storage_key.as_bytes())?;
        Ok(())
    }

    fn persist(&self, messages: &VecDeque<LogMessage>) {
        let snapshot: Vec<&LogMessage> = messages.iter().collect();
        match serde_json::to_vec(&snapshot) {
            Ok(raw) => {
                if let Err(error) = self.tree.insert(self.storage_key.as_bytes(), raw) {
                    tracing::error!(storage_key = %self.storage_key, %error, "failed to persist log messages");
                }
            }
            Err(error) => {
                tracing::error!(storage_key = %self.storage_key, %error, "failed to serialize log messages");
            }
        }
    }
}

impl Appender for LocalStorageAppender {
    fn name(&self) -> &'static str {
        "LocalStorageAppender"
    }

    fn core(&self) -> &AppenderCore {
        &self.core
    }

    fn append(&self, event: &LoggingEvent) {
        let message = LogMessage::from_event(event);
        let max = *self.max_messages.lock().unwrap();
        let mut messages = self.messages.lock().unwrap();
        while messages.len() >= max {
            messages.pop_front();
        }
        messages.push_back(message);
        self.persist(&messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn temp_db() -> Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    fn event(method: &str) -> LoggingEvent {
        LoggingEvent::new(
            Utc::now(),
            Level::Error,
            Some("test".to_string()),
            vec![method.to_string(), "detail".to_string()],
            None,
        )
    }

    #[test]
    fn empty_storage_key_is_rejected() {
        let db = temp_db();
        let err = LocalStorageAppender::new(&db, "").err().unwrap();
        assert!(matches!(err, LoggingError::InvalidConfiguration(_)));
    }

    #[test]
    fn threshold_defaults_to_warn() {
        let db = temp_db();
        let appender = LocalStorageAppender::new(&db, "logs").unwrap();
        assert_eq!(appender.threshold(), Level::Warn);
    }

    #[test]
    fn appended_messages_round_trip_with_millisecond_timestamps() {
        let db = temp_db();
        let appender = LocalStorageAppender::new(&db, "logs").unwrap();
        let events: Vec<LoggingEvent> = (0..4).map(|i| event(&format!("m{i}"))).collect();
        for e in &events {
            appender.append(e);
        }

        let loaded = LocalStorageAppender::load_log_messages(&db, "logs").unwrap();
        assert_eq!(loaded.len(), 4);
        for (stored, original) in loaded.iter().zip(&events) {
            assert_eq!(
                stored.time_stamp.timestamp_millis(),
                original.timestamp_millis()
            );
            assert_eq!(stored.method_name, original.message_parts[0]);
        }
    }

    #[test]
    fn replays_persisted_messages_on_construction() {
        let db = temp_db();
        {
            let appender = LocalStorageAppender::new(&db, "logs").unwrap();
            appender.append(&event("before-restart"));
        }
        let appender = LocalStorageAppender::new(&db, "logs").unwrap();
        let messages = appender.get_log_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].method_name, "before-restart");
    }

    #[test]
    fn corrupt_persisted_data_starts_empty() {
        let db = temp_db();
        db.open_tree(STORAGE_TREE)
            .unwrap()
            .insert("logs", "not json")
            .unwrap();
        let appender = LocalStorageAppender::new(&db, "logs").unwrap();
        assert!(appender.get_log_messages().is_empty());
    }

    #[test]
    fn buffer_is_bounded_and_persisted_bound_matches() {
        let db = temp_db();
        let appender = LocalStorageAppender::new(&db, "logs").unwrap();
        appender.set_max_messages(3);
        for i in 0..8 {
            appender.append(&event(&format!("m{i}")));
        }
        let loaded = LocalStorageAppender::load_log_messages(&db, "logs").unwrap();
        let names: Vec<&str> = loaded.iter().map(|m| m.method_name.as_str()).collect();
        assert_eq!(names, vec!["m5", "m6", "m7"]);
    }

    #[test]
    fn zero_capacity_is_clamped_and_append_terminates() {
        let db = temp_db();
        let appender = LocalStorageAppender::new(&db, "logs").unwrap();
        appender.set_max_messages(0);
        appender.append(&event("a"));
        appender.append(&event("b"));
        let loaded = LocalStorageAppender::load_log_messages(&db, "logs").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].method_name, "b");
    }

    #[test]
    fn shrinking_capacity_rewrites_storage() {
        let db = temp_db();
        let appender = LocalStorageAppender::new(&db, "logs").unwrap();
        for i in 0..5 {
            appender.append(&event(&format!("m{i}")));
        }
        appender.set_max_messages(2);
        let loaded = LocalStorageAppender::load_log_messages(&db, "logs").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].method_name, "m3");
    }

    #[test]
    fn clear_log_removes_the_storage_key() {
        let db = temp_db();
        let appender = LocalStorageAppender::new(&db, "logs").unwrap();
        appender.append(&event("m"));
        appender.clear_log();

        assert!(appender.get_log_messages().is_empty());
        assert!(LocalStorageAppender::load_log_messages(&db, "logs")
            .unwrap()
            .is_empty());
        // The key itself is gone, not merely empty.
        let tree = db.open_tree(STORAGE_TREE).unwrap();
        assert!(tree.get("logs").unwrap().is_none());
    }

    #[test]
    fn static_remove_deletes_sibling_keys() {
        let db = temp_db();
        let appender = LocalStorageAppender::new(&db, "logs").unwrap();
        appender.append(&event("m"));
        LocalStorageAppender::remove_log_messages(&db, "logs").unwrap();
        let tree = db.open_tree(STORAGE_TREE).unwrap();
        assert!(tree.get("logs").unwrap().is_none());
    }
}
