//! Error types for the statistics subsystem.
//!
//! Accounting never returns errors: stopwatches swallow internal failures so
//! that instrumentation can never fail a database operation. The errors here
//! cover the remaining fallible surfaces:
//!
//! - [`StatsError::UnknownOperationType`] - a raw slot index outside the real range of an
//!   operation enum (including the `COUNT` sentinel)
//! - [`StatsError::UnknownErrorType`] - a raw index outside the [`ErrorType`] range
//! - [`StatsError::Config`] - invalid [`AggregatorConfig`] values
//!
//! [`ErrorType`]: crate::ErrorType
//! [`AggregatorConfig`]: crate::AggregatorConfig

use thiserror::Error;

/// Result type alias for fallible statistics APIs.
pub type StatsResult<T> = Result<T, StatsError>;

/// Errors produced by the statistics subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StatsError {
    /// A raw index does not name a real operation slot of the table.
    ///
    /// The index equal to the enum's `COUNT` is the sentinel; reaching it
    /// means the caller computed a slot index incorrectly.
    #[error("Unknown {table} operation type index: {index}")]
    UnknownOperationType {
        /// Name of the statistics table the index was meant for.
        table: &'static str,
        /// The rejected index.
        index: usize,
    },

    /// A raw index does not name a real error type.
    #[error("Unknown error type index: {index}")]
    UnknownErrorType {
        /// The rejected index.
        index: usize,
    },

    /// Configuration validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A value is above its allowed maximum.
    #[error("{field} must be at most {max}, got {value}")]
    AboveMaximum {
        /// Name of the offending field.
        field: &'static str,
        /// Largest accepted value.
        max: String,
        /// The rejected value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_operation_type_display() {
        let err = StatsError::UnknownOperationType { table: "read", index: 4 };
        assert_eq!(err.to_string(), "Unknown read operation type index: 4");
    }

    #[test]
    fn test_config_error_converts_into_stats_error() {
        let err: StatsError = ConfigError::AboveMaximum {
            field: "retained_windows",
            max: "64".into(),
            value: "65".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration error: retained_windows must be at most 64, got 65"
        );
    }
}
