//! This module defines the declarative configuration consumed by
//! [`LoggingService::configure`](crate::service::LoggingService::configure).
//!
//! All structs deserialize from camelCase keys, so a configuration can be
//! loaded verbatim from a JSON settings file.
use serde::Deserialize;

/// Complete configuration for the logging service. Every section is
/// optional; omitted sections leave the current settings untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoggingServiceConfiguration {
    /// Explicit levels for named loggers. The name `root` denotes the root
    /// logger.
    #[serde(default)]
    pub log_levels: Option<Vec<LogLevelSetting>>,

    /// Settings for the remote-delivery appender.
    #[serde(default)]
    pub ajax_appender: Option<AjaxAppenderConfiguration>,

    /// Settings for the persistent local-storage appender.
    #[serde(default)]
    pub local_storage_appender: Option<LocalStorageAppenderConfiguration>,

    /// Settings for the in-memory appender.
    #[serde(default)]
    pub memory_appender: Option<MemoryAppenderConfiguration>,

    /// Settings for the console appender.
    #[serde(default)]
    pub browser_console_appender: Option<ConsoleAppenderConfiguration>,
}

/// Explicit level for one named logger.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLevelSetting {
    /// Logger name, or `root` for the root logger.
    pub logger_name: String,
    /// Level name; one of ALL, TRACE, DEBUG, INFO, WARN, ERROR, FATAL, OFF.
    pub log_level: String,
}

/// Configuration for the remote-delivery appender.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AjaxAppenderConfiguration {
    /// URL receiving the POSTed log messages. Immutable once an appender
    /// exists.
    pub url: String,
    /// Number of messages sent per request. Default: 1.
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// Flush interval in milliseconds; 0 sends immediately. Default: 0.
    #[serde(default)]
    pub timer_interval: Option<u64>,
    /// Threshold level name. Default: ALL.
    #[serde(default)]
    pub threshold: Option<String>,
    /// Enables credentialed requests. Immutable once an appender exists.
    /// Default: false.
    #[serde(default)]
    pub with_credentials: Option<bool>,
}

/// Configuration for the persistent local-storage appender.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStorageAppenderConfiguration {
    /// Storage key holding the serialized messages. Immutable once an
    /// appender exists.
    pub local_storage_key: String,
    /// Maximum number of stored messages. Default: 250.
    #[serde(default)]
    pub max_messages: Option<usize>,
    /// Threshold level name. Default: WARN.
    #[serde(default)]
    pub threshold: Option<String>,
}

/// Configuration for the in-memory appender.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryAppenderConfiguration {
    /// Maximum number of stored messages. Default: 250.
    #[serde(default)]
    pub max_messages: Option<usize>,
    /// Threshold level name. Default: ALL.
    #[serde(default)]
    pub threshold: Option<String>,
}

/// Configuration for the console appender; only the threshold is tunable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleAppenderConfiguration {
    /// Threshold level name. Default: ALL.
    #[serde(default)]
    pub threshold: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_camel_case_json() {
        let raw = r#"{
            "logLevels": [
                {"loggerName": "root", "logLevel": "DEBUG"},
                {"loggerName": "app.net", "logLevel": "INFO"}
            ],
            "ajaxAppender": {"url": "https://logs.example/ingest", "batchSize": 10, "timerInterval": 5000},
            "localStorageAppender": {"localStorageKey": "app.logs", "maxMessages": 100, "threshold": "ERROR"},
            "memoryAppender": {"maxMessages": 50},
            "browserConsoleAppender": {"threshold": "WARN"}
        }"#;
        let config: LoggingServiceConfiguration = serde_json::from_str(raw).unwrap();

        let levels = config.log_levels.unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[1].logger_name, "app.net");

        let ajax = config.ajax_appender.unwrap();
        assert_eq!(ajax.url, "https://logs.example/ingest");
        assert_eq!(ajax.batch_size, Some(10));
        assert_eq!(ajax.timer_interval, Some(5000));
        assert_eq!(ajax.with_credentials, None);

        let local = config.local_storage_appender.unwrap();
        assert_eq!(local.local_storage_key, "app.logs");
        assert_eq!(local.threshold.as_deref(), Some("ERROR"));

        assert_eq!(config.memory_appender.unwrap().max_messages, Some(50));
        assert_eq!(
            config.browser_console_appender.unwrap().threshold.as_deref(),
            Some("WARN")
        );
    }

    #[test]
    fn empty_object_is_a_valid_configuration() {
        let config: LoggingServiceConfiguration = serde_json::from_str("{}").unwrap();
        assert!(config.log_levels.is_none());
        assert!(config.ajax_appender.is_none());
    }
}
