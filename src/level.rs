//! This module defines the logging levels and their ordering.
use std::fmt;
use std::str::FromStr;

use crate::error::LoggingError;

/// Logging levels, ordered by severity.
///
/// `All` and `Off` are sentinels: `All` accepts everything when used as a
/// threshold, `Off` rejects everything. The derived `Ord` implementation is
/// the authoritative severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    All,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Off,
}

impl Level {
    /// Returns the upper-case name of the level.
    pub fn name(&self) -> &'static str {
        match self {
            Level::All => "ALL",
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Off => "OFF",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = LoggingError;

    /// Parses an upper-case level name.
    ///
    /// # Errors
    ///
    /// Returns `LoggingError::InvalidLogLevel` containing the offending
    /// string if the name does not match any level.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALL" => Ok(Level::All),
            "TRACE" => Ok(Level::Trace),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "FATAL" => Ok(Level::Fatal),
            "OFF" => Ok(Level::Off),
            _ => Err(LoggingError::InvalidLogLevel(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        assert!(Level::All < Level::Trace);
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
        assert!(Level::Fatal < Level::Off);
    }

    #[test]
    fn equal_levels_have_equal_rank() {
        assert_eq!(Level::Warn, Level::Warn);
        assert_ne!(Level::Warn, Level::Error);
    }

    #[test]
    fn parses_all_level_names() {
        for (name, level) in [
            ("ALL", Level::All),
            ("TRACE", Level::Trace),
            ("DEBUG", Level::Debug),
            ("INFO", Level::Info),
            ("WARN", Level::Warn),
            ("ERROR", Level::Error),
            ("FATAL", Level::Fatal),
            ("OFF", Level::Off),
        ] {
            assert_eq!(name.parse::<Level>().unwrap(), level);
            assert_eq!(level.name(), name);
        }
    }

    #[test]
    fn rejects_unknown_level_name() {
        let err = "VERBOSE".parse::<Level>().unwrap_err();
        assert!(err.to_string().contains("VERBOSE"));
    }
}
