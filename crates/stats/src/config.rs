//! Aggregator configuration.
//!
//! # Example
//!
//! ```
//! use dbclient_stats::AggregatorConfig;
//!
//! let config = AggregatorConfig::builder().retained_windows(3).build()?;
//! assert_eq!(config.retained_windows(), 3);
//! # Ok::<(), dbclient_stats::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of prior windows kept after rotation.
pub const DEFAULT_RETAINED_WINDOWS: usize = 1;

/// Upper bound on retained windows.
pub const MAX_RETAINED_WINDOWS: usize = 64;

/// Configuration for an [`Aggregator`](crate::Aggregator).
///
/// The aggregator keeps one current window plus up to `retained_windows`
/// rotated-out windows for export. Rotation itself is driven by the exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregatorConfig {
    #[serde(default = "default_retained_windows")]
    retained_windows: usize,
}

fn default_retained_windows() -> usize {
    DEFAULT_RETAINED_WINDOWS
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self { retained_windows: DEFAULT_RETAINED_WINDOWS }
    }
}

#[bon::bon]
impl AggregatorConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AboveMaximum`] if `retained_windows` exceeds
    /// [`MAX_RETAINED_WINDOWS`].
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_RETAINED_WINDOWS)] retained_windows: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { retained_windows };
        config.validate()?;
        Ok(config)
    }

    /// Checks the bounds of a configuration obtained through deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AboveMaximum`] if `retained_windows` exceeds
    /// [`MAX_RETAINED_WINDOWS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retained_windows > MAX_RETAINED_WINDOWS {
            return Err(ConfigError::AboveMaximum {
                field: "retained_windows",
                max: MAX_RETAINED_WINDOWS.to_string(),
                value: self.retained_windows.to_string(),
            });
        }
        Ok(())
    }

    /// Number of rotated-out windows kept for export.
    #[must_use]
    pub fn retained_windows(&self) -> usize {
        self.retained_windows
    }
}
