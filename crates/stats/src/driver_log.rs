//! Forwarding of driver log messages to `tracing`.

use std::fmt;

use tracing::Level;

/// Log level reported by the database driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverLogLevel {
    /// Error.
    Error,
    /// Critical condition.
    Critical,
    /// Warning.
    Warning,
    /// Notable informational message.
    Message,
    /// Informational message.
    Info,
    /// Debug output.
    Debug,
    /// Protocol-level tracing.
    Trace,
}

impl DriverLogLevel {
    /// Decodes a raw driver log level. Returns `None` for unknown values.
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Error),
            1 => Some(Self::Critical),
            2 => Some(Self::Warning),
            3 => Some(Self::Message),
            4 => Some(Self::Info),
            5 => Some(Self::Debug),
            6 => Some(Self::Trace),
            _ => None,
        }
    }

    /// `tracing` level the message is forwarded at.
    #[must_use]
    pub fn severity(self) -> Level {
        match self {
            Self::Error | Self::Critical | Self::Warning => Level::WARN,
            Self::Message | Self::Info => Level::DEBUG,
            Self::Debug | Self::Trace => Level::TRACE,
        }
    }

    /// Lowercase level name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Message => "message",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for DriverLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forwards one driver log message.
///
/// Unknown levels are reported with a warning and the message is forwarded at
/// `WARN`.
pub fn log_driver_message(raw_level: i32, domain: &str, message: &str) {
    let (level, severity) = match DriverLogLevel::from_raw(raw_level) {
        Some(level) => (level.as_str(), level.severity()),
        None => {
            tracing::warn!(raw_level, "Unknown driver log level");
            ("unknown", Level::WARN)
        },
    };

    if severity == Level::WARN {
        tracing::warn!(domain, "Mongo driver {level} [{domain}]: {message}");
    } else if severity == Level::DEBUG {
        tracing::debug!(domain, "Mongo driver {level} [{domain}]: {message}");
    } else {
        tracing::trace!(domain, "Mongo driver {level} [{domain}]: {message}");
    }
}
