//! Outcome taxonomy for accounted operations.
//!
//! Drivers report failures with a rich, driver-specific vocabulary
//! ([`DriverErrorKind`]). Statistics only keep a small closed set of buckets
//! ([`ErrorType`]); [`ErrorType::classify`] is the total mapping between the two.

use std::fmt;

use crate::error::StatsError;

/// Error kinds reported by the database driver.
///
/// Raw driver codes are decoded with [`DriverErrorKind::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DriverErrorKind {
    /// The driver reported no error.
    NoError,
    /// Transport-level failure talking to a server.
    Network,
    /// No suitable server could be selected.
    ClusterUnavailable,
    /// The server speaks an unsupported protocol version.
    IncompatibleServer,
    /// Authentication was rejected.
    Authentication,
    /// Generic query failure.
    Query,
    /// The query or its options were malformed.
    InvalidQueryArgument,
    /// The server returned an error.
    Server,
    /// The write concern could not be satisfied.
    WriteConcern,
    /// A unique index constraint was violated.
    DuplicateKey,
    /// Anything else.
    Other,
}

impl DriverErrorKind {
    /// Maps a raw driver error code to its kind.
    ///
    /// Codes the driver may add in the future map to [`DriverErrorKind::Other`].
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::Network,
            2 => Self::ClusterUnavailable,
            3 => Self::IncompatibleServer,
            4 => Self::Authentication,
            5 => Self::Query,
            6 => Self::InvalidQueryArgument,
            7 => Self::Server,
            8 => Self::WriteConcern,
            9 => Self::DuplicateKey,
            _ => Self::Other,
        }
    }
}

/// Outcome bucket an operation is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorType {
    /// The operation completed successfully.
    Success,
    /// Network failure.
    Network,
    /// Cluster unavailable. Classified driver errors report this as [`ErrorType::Network`].
    ClusterUnavailable,
    /// Unsupported server version.
    BadServerVersion,
    /// Authentication failure.
    AuthFailure,
    /// Malformed query argument.
    BadQueryArgument,
    /// Server-side error.
    Server,
    /// Write concern failure.
    WriteConcern,
    /// Duplicate key.
    DuplicateKey,
    /// Unclassified failure, including operations dropped without accounting.
    Other,
}

impl ErrorType {
    /// Number of error types. Also the sentinel index one past the last slot.
    pub const COUNT: usize = 10;

    /// Every error type, in slot order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Success,
        Self::Network,
        Self::ClusterUnavailable,
        Self::BadServerVersion,
        Self::AuthFailure,
        Self::BadQueryArgument,
        Self::Server,
        Self::WriteConcern,
        Self::DuplicateKey,
        Self::Other,
    ];

    /// Maps a driver error kind to its statistics bucket.
    #[must_use]
    pub fn classify(kind: DriverErrorKind) -> Self {
        match kind {
            DriverErrorKind::Network | DriverErrorKind::ClusterUnavailable => Self::Network,
            DriverErrorKind::IncompatibleServer => Self::BadServerVersion,
            DriverErrorKind::Authentication => Self::AuthFailure,
            DriverErrorKind::InvalidQueryArgument => Self::BadQueryArgument,
            DriverErrorKind::Server => Self::Server,
            DriverErrorKind::WriteConcern => Self::WriteConcern,
            DriverErrorKind::DuplicateKey => Self::DuplicateKey,
            DriverErrorKind::NoError | DriverErrorKind::Query | DriverErrorKind::Other => {
                Self::Other
            },
        }
    }

    /// Slot index of this error type in a counters array.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Metric label for this error type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Network => "network",
            Self::ClusterUnavailable => "cluster-unavailable",
            Self::BadServerVersion => "server-version",
            Self::AuthFailure => "auth-failure",
            Self::BadQueryArgument => "bad-query-arg",
            Self::Server => "server-error",
            Self::WriteConcern => "write-concern",
            Self::DuplicateKey => "duplicate-key",
            Self::Other => "other",
        }
    }

    /// Returns `true` for every outcome except [`ErrorType::Success`].
    #[must_use]
    pub fn is_error(self) -> bool {
        self != Self::Success
    }
}

impl From<DriverErrorKind> for ErrorType {
    fn from(kind: DriverErrorKind) -> Self {
        Self::classify(kind)
    }
}

impl TryFrom<usize> for ErrorType {
    type Error = StatsError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL.get(index).copied().ok_or(StatsError::UnknownErrorType { index })
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
