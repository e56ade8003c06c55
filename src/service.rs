//! This module provides the logging service which wires up the default
//! appenders and applies declarative configuration.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sled::Db;
use tokio::sync::mpsc;

use crate::appender::{
    AjaxAppender, Appender, ConsoleAppender, LocalStorageAppender, MemoryAppender,
};
use crate::config::LoggingServiceConfiguration;
use crate::error::LoggingError;
use crate::layout::PatternLayout;
use crate::level::Level;
use crate::logger::{Logger, LoggerRegistry};
use crate::types::{LogMessage, LogMessagesChanged};

/// Layout used for the default console and memory appenders.
const DEFAULT_PATTERN: &str = "%d{HH:mm:ss,SSS} %c %m";

/// Service owning the logger registry and the standard appenders.
///
/// By default the root logger is set to WARN and feeds a console appender
/// and a memory appender, both with threshold ALL. `configure` amends these
/// settings and optionally attaches remote-delivery and persistent
/// appenders.
pub struct LoggingService {
    registry: Arc<LoggerRegistry>,
    db: Db,
    console_appender: Arc<ConsoleAppender>,
    memory_appender: Arc<MemoryAppender>,
    ajax_appender: Mutex<Option<Arc<AjaxAppender>>>,
    local_storage_appender: Mutex<Option<Arc<LocalStorageAppender>>>,
    failure_sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl LoggingService {
    /// Creates a service with the default wiring.
    ///
    /// # Arguments
    ///
    /// * `db` - Store used by persistent appenders and the stored-message
    ///   accessors.
    pub fn new(db: Db) -> Self {
        let registry = LoggerRegistry::new(Level::Warn);
        let root = registry.root();

        let console_appender = Arc::new(ConsoleAppender::new());
        console_appender.set_layout(Arc::new(PatternLayout::new(DEFAULT_PATTERN)));
        root.add_appender(console_appender.clone());

        let memory_appender = Arc::new(MemoryAppender::new());
        memory_appender.set_layout(Arc::new(PatternLayout::new(DEFAULT_PATTERN)));
        root.add_appender(memory_appender.clone());

        Self {
            registry,
            db,
            console_appender,
            memory_appender,
            ajax_appender: Mutex::new(None),
            local_storage_appender: Mutex::new(None),
            failure_sender: Mutex::new(None),
        }
    }

    /// Sets the sender notified whenever the memory appender's stored
    /// messages change.
    pub fn set_messages_changed_sender(&self, sender: mpsc::UnboundedSender<LogMessagesChanged>) {
        self.memory_appender.set_changed_sender(sender);
    }

    /// Sets the sender notified when the remote appender fails to deliver
    /// messages. Also re-wires an already active remote appender.
    pub fn set_ajax_failure_sender(&self, sender: mpsc::UnboundedSender<String>) {
        if let Some(appender) = self.ajax_appender.lock().unwrap().as_ref() {
            appender.set_failure_sender(sender.clone());
        }
        *self.failure_sender.lock().unwrap() = Some(sender);
    }

    /// Applies a declarative configuration.
    ///
    /// Validation is fail-fast: every section is checked (level names,
    /// thresholds, required fields, immutable fields) before any setting is
    /// applied, so a failed call leaves the previous configuration fully
    /// intact.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLogLevel` for unparseable level or threshold names,
    /// `InvalidConfiguration` for missing required fields, and
    /// `ImmutableField` when the configuration tries to change the ajax
    /// URL, the credentials mode, or the storage key of an existing
    /// appender.
    pub fn configure(&self, config: &LoggingServiceConfiguration) -> Result<(), LoggingError> {
        // Validation pass: parse everything and construct replacement
        // appenders without touching the logger tree.
        let mut levels = Vec::new();
        if let Some(settings) = &config.log_levels {
            for setting in settings {
                levels.push((setting.logger_name.clone(), setting.log_level.parse::<Level>()?));
            }
        }

        let new_ajax = match &config.ajax_appender {
            Some(cfg) => {
                let threshold = parse_threshold(cfg.threshold.as_deref())?;
                if cfg.url.is_empty() {
                    return Err(LoggingError::InvalidConfiguration(
                        "ajaxAppender.url may not be empty".to_string(),
                    ));
                }
                let with_credentials = cfg.with_credentials.unwrap_or(false);
                if let Some(existing) = self.ajax_appender.lock().unwrap().as_ref() {
                    if existing.url() != cfg.url {
                        return Err(LoggingError::ImmutableField {
                            field: "ajaxAppender.url",
                        });
                    }
                    if existing.with_credentials() != with_credentials {
                        return Err(LoggingError::ImmutableField {
                            field: "ajaxAppender.withCredentials",
                        });
                    }
                }
                let appender = Arc::new(AjaxAppender::new(&cfg.url, with_credentials)?);
                if let Some(threshold) = threshold {
                    appender.set_threshold(threshold);
                }
                if let Some(batch_size) = cfg.batch_size {
                    appender.set_batch_size(batch_size);
                }
                Some((appender, cfg.timer_interval.unwrap_or(0)))
            }
            None => None,
        };

        let new_local_storage = match &config.local_storage_appender {
            Some(cfg) => {
                let threshold = parse_threshold(cfg.threshold.as_deref())?;
                if cfg.local_storage_key.is_empty() {
                    return Err(LoggingError::InvalidConfiguration(
                        "localStorageAppender.localStorageKey may not be empty".to_string(),
                    ));
                }
                if let Some(existing) = self.local_storage_appender.lock().unwrap().as_ref() {
                    if existing.storage_key() != cfg.local_storage_key {
                        return Err(LoggingError::ImmutableField {
                            field: "localStorageAppender.localStorageKey",
                        });
                    }
                }
                let appender = Arc::new(LocalStorageAppender::new(&self.db, &cfg.local_storage_key)?);
                appender.set_layout(Arc::new(PatternLayout::new(DEFAULT_PATTERN)));
                if let Some(threshold) = threshold {
                    appender.set_threshold(threshold);
                }
                // Only positive capacities are applied; zero keeps the
                // appender's default.
                if let Some(max_messages) = cfg.max_messages.filter(|m| *m > 0) {
                    appender.set_max_messages(max_messages);
                }
                Some(appender)
            }
            None => None,
        };

        let memory_threshold = match &config.memory_appender {
            Some(cfg) => parse_threshold(cfg.threshold.as_deref())?,
            None => None,
        };
        let console_threshold = match &config.browser_console_appender {
            Some(cfg) => parse_threshold(cfg.threshold.as_deref())?,
            None => None,
        };

        // Apply pass: nothing below can fail.
        let root = self.registry.root();
        for (logger_name, level) in levels {
            self.registry.get_logger(&logger_name).set_log_level(level);
        }

        if let Some((appender, timer_interval_ms)) = new_ajax {
            if let Some(sender) = self.failure_sender.lock().unwrap().as_ref() {
                appender.set_failure_sender(sender.clone());
            }
            let old = self.ajax_appender.lock().unwrap().take();
            self.registry.remove_appenders_named(0, "AjaxAppender");
            if let Some(old) = old {
                old.dispose();
            }
            appender.set_timer_interval(Duration::from_millis(timer_interval_ms));
            root.add_appender(appender.clone());
            *self.ajax_appender.lock().unwrap() = Some(appender);
        }

        if let Some(appender) = new_local_storage {
            self.registry.remove_appenders_named(0, "LocalStorageAppender");
            root.add_appender(appender.clone());
            *self.local_storage_appender.lock().unwrap() = Some(appender);

            // The memory appender stays last on the root so viewers keep
            // seeing the most recently delivered message ordering.
            let memory: Arc<dyn Appender> = self.memory_appender.clone();
            root.remove_appender(&memory);
            root.add_appender(memory);
        }

        if let Some(cfg) = &config.memory_appender {
            if let Some(max_messages) = cfg.max_messages.filter(|m| *m > 0) {
                self.memory_appender.set_max_messages(max_messages);
            }
            if let Some(threshold) = memory_threshold {
                self.memory_appender.set_threshold(threshold);
            }
        }
        if config.browser_console_appender.is_some() {
            if let Some(threshold) = console_threshold {
                self.console_appender.set_threshold(threshold);
            }
        }
        Ok(())
    }

    /// Gets the root logger from which all other loggers derive.
    pub fn get_root_logger(&self) -> Logger {
        self.registry.root()
    }

    /// Gets the logger with the given name, creating it if needed.
    pub fn get_logger(&self, logger_name: &str) -> Logger {
        self.registry.get_logger(logger_name)
    }

    /// Returns the messages currently held by the memory appender, oldest
    /// first.
    pub fn get_log_messages(&self) -> Vec<LogMessage> {
        self.memory_appender.get_log_messages()
    }

    /// Removes all messages from the memory appender.
    pub fn remove_log_messages(&self) {
        self.memory_appender.remove_log_messages();
    }

    /// Reads the messages persisted under the given storage keys.
    ///
    /// `keys` is a comma-separated list; the messages of all keys are
    /// concatenated and sorted by timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or holds unparseable
    /// data.
    pub fn get_log_messages_from_local_storage(
        &self,
        keys: &str,
    ) -> Result<Vec<LogMessage>, LoggingError> {
        let mut messages = Vec::new();
        for key in keys.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            messages.extend(LocalStorageAppender::load_log_messages(&self.db, key)?);
        }
        messages.sort_by_key(|m| m.time_stamp);
        Ok(messages)
    }

    /// Removes the messages persisted under the given storage key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn remove_log_messages_from_local_storage(&self, key: &str) -> Result<(), LoggingError> {
        if let Some(appender) = self.local_storage_appender.lock().unwrap().as_ref() {
            if appender.storage_key() == key {
                appender.clear_log();
                return Ok(());
            }
        }
        LocalStorageAppender::remove_log_messages(&self.db, key)
    }

    /// Returns the most recent remote-delivery failure message, if any.
    pub fn last_ajax_failure(&self) -> Option<String> {
        self.ajax_appender
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|appender| appender.last_failure())
    }
}

fn parse_threshold(threshold: Option<&str>) -> Result<Option<Level>, LoggingError> {
    threshold.map(str::parse).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AjaxAppenderConfiguration, LocalStorageAppenderConfiguration, LogLevelSetting,
        MemoryAppenderConfiguration,
    };
    use crate::event::LoggingEvent;
    use chrono::{DateTime, TimeZone, Utc};

    fn service() -> LoggingService {
        let db = sled::Config::new().temporary(true).open().unwrap();
        LoggingService::new(db)
    }

    fn appender_names(root: &Logger) -> Vec<&'static str> {
        root.effective_appenders().iter().map(|a| a.name()).collect()
    }

    #[test]
    fn default_wiring_has_console_and_memory_on_root() {
        let service = service();
        let root = service.get_root_logger();
        assert_eq!(root.effective_level(), Level::Warn);
        assert_eq!(appender_names(&root), vec!["ConsoleAppender", "MemoryAppender"]);
    }

    #[test]
    fn default_root_level_filters_info_but_keeps_warn() {
        let service = service();
        let logger = service.get_logger("app.page");
        logger.info("loadData", &[]);
        logger.warn("loadData", &[&"slow response"]);

        let messages = service.get_log_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].level, "WARN");
        assert_eq!(messages[0].method_name, "loadData");
    }

    #[test]
    fn configure_sets_levels_for_named_and_root_loggers() {
        let service = service();
        let config = LoggingServiceConfiguration {
            log_levels: Some(vec![
                LogLevelSetting {
                    logger_name: "root".to_string(),
                    log_level: "DEBUG".to_string(),
                },
                LogLevelSetting {
                    logger_name: "app.net".to_string(),
                    log_level: "ERROR".to_string(),
                },
            ]),
            ..Default::default()
        };
        service.configure(&config).unwrap();

        assert_eq!(service.get_root_logger().effective_level(), Level::Debug);
        assert_eq!(service.get_logger("app.net").effective_level(), Level::Error);
        // Unconfigured loggers inherit from root.
        assert_eq!(service.get_logger("app.ui").effective_level(), Level::Debug);
    }

    #[test]
    fn configure_fails_fast_without_applying_anything() {
        let service = service();
        let config = LoggingServiceConfiguration {
            log_levels: Some(vec![
                LogLevelSetting {
                    logger_name: "app.first".to_string(),
                    log_level: "DEBUG".to_string(),
                },
                LogLevelSetting {
                    logger_name: "app.second".to_string(),
                    log_level: "LOUD".to_string(),
                },
            ]),
            ..Default::default()
        };
        let err = service.configure(&config).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidLogLevel(_)));
        assert!(err.to_string().contains("LOUD"));
        // The valid first entry must not have been applied.
        assert_eq!(service.get_logger("app.first").effective_level(), Level::Warn);
    }

    #[test]
    fn configure_adjusts_memory_appender_in_place() {
        let service = service();
        let config = LoggingServiceConfiguration {
            memory_appender: Some(MemoryAppenderConfiguration {
                max_messages: Some(2),
                threshold: Some("ERROR".to_string()),
            }),
            ..Default::default()
        };
        service.configure(&config).unwrap();

        let logger = service.get_logger("app");
        logger.warn("w", &[]);
        logger.error("e1", &[]);
        logger.error("e2", &[]);
        logger.error("e3", &[]);
        let messages = service.get_log_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].method_name, "e2");
        assert_eq!(messages[1].method_name, "e3");
    }

    #[test]
    fn zero_max_messages_keeps_current_capacity() {
        let service = service();
        let config = |max: usize| LoggingServiceConfiguration {
            memory_appender: Some(MemoryAppenderConfiguration {
                max_messages: Some(max),
                threshold: None,
            }),
            ..Default::default()
        };
        service.configure(&config(2)).unwrap();
        service.configure(&config(0)).unwrap();

        let logger = service.get_logger("app");
        logger.error("e1", &[]);
        logger.error("e2", &[]);
        logger.error("e3", &[]);
        let messages = service.get_log_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].method_name, "e2");
    }

    #[test]
    fn local_storage_appender_keeps_memory_appender_last() {
        let service = service();
        let config = LoggingServiceConfiguration {
            local_storage_appender: Some(LocalStorageAppenderConfiguration {
                local_storage_key: "app.logs".to_string(),
                max_messages: None,
                threshold: None,
            }),
            ..Default::default()
        };
        service.configure(&config).unwrap();
        assert_eq!(
            appender_names(&service.get_root_logger()),
            vec!["ConsoleAppender", "LocalStorageAppender", "MemoryAppender"]
        );
    }

    #[test]
    fn local_storage_messages_flow_through_service_accessors() {
        let service = service();
        let config = LoggingServiceConfiguration {
            local_storage_appender: Some(LocalStorageAppenderConfiguration {
                local_storage_key: "app.logs".to_string(),
                max_messages: None,
                threshold: None,
            }),
            ..Default::default()
        };
        service.configure(&config).unwrap();

        service.get_logger("app").error("boom", &[]);
        let stored = service.get_log_messages_from_local_storage("app.logs").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].method_name, "boom");

        service.remove_log_messages_from_local_storage("app.logs").unwrap();
        assert!(service
            .get_log_messages_from_local_storage("app.logs")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn reads_multiple_storage_keys_time_sorted() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let service = LoggingService::new(db.clone());

        fn event_at(ts: DateTime<Utc>, method: &str) -> LoggingEvent {
            LoggingEvent::new(ts, Level::Error, None, vec![method.to_string()], None)
        }
        let first = LocalStorageAppender::new(&db, "k1").unwrap();
        let second = LocalStorageAppender::new(&db, "k2").unwrap();
        first.append(&event_at(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 2).unwrap(), "b"));
        second.append(&event_at(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 1).unwrap(), "a"));
        second.append(&event_at(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 3).unwrap(), "c"));

        let merged = service.get_log_messages_from_local_storage("k1, k2").unwrap();
        let names: Vec<&str> = merged.iter().map(|m| m.method_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn changing_local_storage_key_is_rejected() {
        let service = service();
        let config = |key: &str| LoggingServiceConfiguration {
            local_storage_appender: Some(LocalStorageAppenderConfiguration {
                local_storage_key: key.to_string(),
                max_messages: None,
                threshold: None,
            }),
            ..Default::default()
        };
        service.configure(&config("first.key")).unwrap();
        let err = service.configure(&config("second.key")).unwrap_err();
        assert!(matches!(
            err,
            LoggingError::ImmutableField {
                field: "localStorageAppender.localStorageKey"
            }
        ));
    }

    #[test]
    fn ajax_appender_is_replaced_not_stacked() {
        let service = service();
        let config = LoggingServiceConfiguration {
            ajax_appender: Some(AjaxAppenderConfiguration {
                url: "https://logs.example/ingest".to_string(),
                batch_size: Some(5),
                timer_interval: None,
                threshold: Some("ERROR".to_string()),
                with_credentials: None,
            }),
            ..Default::default()
        };
        service.configure(&config).unwrap();
        service.configure(&config).unwrap();

        let names = appender_names(&service.get_root_logger());
        assert_eq!(
            names.iter().filter(|n| **n == "AjaxAppender").count(),
            1
        );
    }

    #[test]
    fn changing_ajax_url_or_credentials_is_rejected() {
        let service = service();
        let config = |url: &str, creds: Option<bool>| LoggingServiceConfiguration {
            ajax_appender: Some(AjaxAppenderConfiguration {
                url: url.to_string(),
                batch_size: None,
                timer_interval: None,
                threshold: None,
                with_credentials: creds,
            }),
            ..Default::default()
        };
        service
            .configure(&config("https://logs.example/a", None))
            .unwrap();

        let err = service
            .configure(&config("https://logs.example/b", None))
            .unwrap_err();
        assert!(matches!(
            err,
            LoggingError::ImmutableField {
                field: "ajaxAppender.url"
            }
        ));

        let err = service
            .configure(&config("https://logs.example/a", Some(true)))
            .unwrap_err();
        assert!(matches!(
            err,
            LoggingError::ImmutableField {
                field: "ajaxAppender.withCredentials"
            }
        ));
    }

    #[test]
    fn empty_configuration_changes_nothing() {
        let service = service();
        service
            .configure(&LoggingServiceConfiguration::default())
            .unwrap();
        let root = service.get_root_logger();
        assert_eq!(root.effective_level(), Level::Warn);
        assert_eq!(appender_names(&root), vec!["ConsoleAppender", "MemoryAppender"]);
    }
}
