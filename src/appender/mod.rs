//! This module defines the appender contract and the concrete sinks.
//!
//! Appenders are the delivery side of the pipeline: a logger hands a
//! `LoggingEvent` to `do_append`, which applies the appender's own
//! threshold before delegating to the sink-specific `append`.
pub mod ajax;
pub mod console;
pub mod local_storage;
pub mod memory;

pub use ajax::AjaxAppender;
pub use console::ConsoleAppender;
pub use local_storage::LocalStorageAppender;
pub use memory::MemoryAppender;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::event::LoggingEvent;
use crate::layout::{Layout, PatternLayout};
use crate::level::Level;

/// Global switch disabling all appenders at once.
static ENABLED: AtomicBool = AtomicBool::new(true);

/// Enables or disables logging globally. While disabled, `do_append` is a
/// no-op for every appender.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

/// Returns whether logging is globally enabled.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// State shared by every appender: layout, threshold and bookkeeping of
/// the loggers the appender is attached to.
pub struct AppenderCore {
    layout: Mutex<Arc<dyn Layout>>,
    threshold: Mutex<Level>,
    registered_loggers: Mutex<HashSet<String>>,
}

impl AppenderCore {
    /// Creates a core with the given layout and a permissive `All`
    /// threshold.
    pub fn new(layout: Arc<dyn Layout>) -> Self {
        Self {
            layout: Mutex::new(layout),
            threshold: Mutex::new(Level::All),
            registered_loggers: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for AppenderCore {
    fn default() -> Self {
        Self::new(Arc::new(PatternLayout::default()))
    }
}

/// A destination for filtered logging events.
///
/// Concrete sinks implement `append`; the threshold gate in `do_append` is
/// provided once here so every sink honors the exactly-once threshold-check
/// contract.
pub trait Appender: Send + Sync {
    /// Identifies the appender kind, e.g. `"MemoryAppender"`.
    fn name(&self) -> &'static str;

    /// Gives access to the shared layout/threshold state.
    fn core(&self) -> &AppenderCore;

    /// Sink-specific delivery of an event which already passed the
    /// threshold check.
    fn append(&self, event: &LoggingEvent);

    /// Appends the event if logging is globally enabled and the event's
    /// level reaches the appender's threshold; otherwise does nothing.
    fn do_append(&self, event: &LoggingEvent) {
        if is_enabled() && event.level >= self.threshold() {
            self.append(event);
        }
    }

    /// Returns the current layout.
    fn layout(&self) -> Arc<dyn Layout> {
        self.core().layout.lock().unwrap().clone()
    }

    /// Replaces the layout.
    fn set_layout(&self, layout: Arc<dyn Layout>) {
        *self.core().layout.lock().unwrap() = layout;
    }

    /// Returns the current threshold.
    fn threshold(&self) -> Level {
        *self.core().threshold.lock().unwrap()
    }

    /// Sets the minimum level this appender accepts.
    fn set_threshold(&self, threshold: Level) {
        *self.core().threshold.lock().unwrap() = threshold;
    }

    /// Bookkeeping: records that the appender was attached to a logger.
    fn set_added_to_logger(&self, logger_name: &str) {
        self.core()
            .registered_loggers
            .lock()
            .unwrap()
            .insert(logger_name.to_string());
    }

    /// Bookkeeping: records that the appender was detached from a logger.
    fn set_removed_from_logger(&self, logger_name: &str) {
        self.core()
            .registered_loggers
            .lock()
            .unwrap()
            .remove(logger_name);
    }

    /// Names of the loggers this appender is currently attached to.
    fn registered_loggers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .core()
            .registered_loggers
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// An appender which only counts how often `append` is called.
    pub struct CountingAppender {
        core: AppenderCore,
        pub appended: AtomicUsize,
    }

    impl CountingAppender {
        pub fn new() -> Self {
            Self {
                core: AppenderCore::default(),
                appended: AtomicUsize::new(0),
            }
        }

        pub fn count(&self) -> usize {
            self.appended.load(Ordering::SeqCst)
        }
    }

    impl Appender for CountingAppender {
        fn name(&self) -> &'static str {
            "CountingAppender"
        }

        fn core(&self) -> &AppenderCore {
            &self.core
        }

        fn append(&self, _event: &LoggingEvent) {
            self.appended.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::CountingAppender;
    use super::*;
    use chrono::Utc;

    fn event(level: Level) -> LoggingEvent {
        LoggingEvent::new(Utc::now(), level, None, vec!["m".into()], None)
    }

    #[test]
    fn threshold_gates_append() {
        let appender = CountingAppender::new();
        appender.set_threshold(Level::Warn);

        appender.do_append(&event(Level::Trace));
        appender.do_append(&event(Level::Info));
        assert_eq!(appender.count(), 0);

        appender.do_append(&event(Level::Warn));
        appender.do_append(&event(Level::Fatal));
        assert_eq!(appender.count(), 2);
    }

    #[test]
    fn default_threshold_accepts_every_level() {
        let appender = CountingAppender::new();
        for level in [
            Level::Trace,
            Level::Debug,
            Level::Info,
            Level::Warn,
            Level::Error,
            Level::Fatal,
        ] {
            appender.do_append(&event(level));
        }
        assert_eq!(appender.count(), 6);
    }

    #[test]
    fn tracks_registered_loggers() {
        let appender = CountingAppender::new();
        appender.set_added_to_logger("a");
        appender.set_added_to_logger("b");
        appender.set_removed_from_logger("a");
        assert_eq!(appender.registered_loggers(), vec!["b".to_string()]);
    }
}
