//! This module defines the layout strategies which turn a logging event
//! into a formatted string.
pub mod json;
pub mod pattern;

pub use json::JsonLayout;
pub use pattern::PatternLayout;

use crate::event::LoggingEvent;

/// A pure formatting strategy turning one event into a string.
///
/// Layouts must be deterministic for a given event and must not fail on
/// events without a logger name or exception.
pub trait Layout: Send + Sync {
    /// Formats the given event.
    fn format(&self, event: &LoggingEvent) -> String;
}
