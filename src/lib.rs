//! Hierarchical structured-logging facade.
//!
//! The crate provides a logger hierarchy with inherited levels, pluggable
//! appenders (in-memory, locally persisted, remote HTTP delivery, console),
//! pattern- and JSON-based layouts, and a [`LoggingService`] which wires
//! everything together from a declarative configuration.
pub mod appender;
pub mod config;
pub mod error;
pub mod event;
pub mod layout;
pub mod level;
pub mod logger;
pub mod service;
pub mod types;

pub use appender::{
    AjaxAppender, Appender, ConsoleAppender, LocalStorageAppender, MemoryAppender,
};
pub use config::LoggingServiceConfiguration;
pub use error::LoggingError;
pub use event::LoggingEvent;
pub use layout::{JsonLayout, Layout, PatternLayout};
pub use level::Level;
pub use logger::{Json, LogArgument, Logger, LoggerRegistry};
pub use service::LoggingService;
pub use types::{LogMessage, LogMessagesChanged};
