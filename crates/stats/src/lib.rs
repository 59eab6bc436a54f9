//! Operation statistics for a database client.
//!
//! Every database call made through the client is timed by a stopwatch and
//! accounted into a shared statistics table: one outcome counter increment and
//! one latency sample per call. Tables are kept per kind of operation (reads,
//! writes, connection pool) and live inside an [`Aggregator`], which lets an
//! exporter rotate windows without stalling callers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Client / connection pool                   │
//! │      OperationStopwatch · PoolRequestStopwatch · ...         │
//! ├──────────────────────────────────────────────────────────────┤
//! │                  Aggregator<T: StatisticsTable>              │
//! │     current window (ArcSwap) │ retained windows (history)    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ReadOperationStatistics │ WriteOperationStatistics │ Pool…  │
//! │        [OperationStatisticsItem; OpType::COUNT]              │
//! ├──────────────────────────────────────────────────────────────┤
//! │     per-ErrorType atomic counters + LatencyAccumulator       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use dbclient_stats::{
//!     Aggregator, DriverErrorKind, ErrorType, OperationStopwatch, ReadOpType,
//!     ReadOperationStatistics, TraceScope,
//! };
//!
//! let reads: Arc<Aggregator<ReadOperationStatistics>> = Arc::new(Aggregator::new());
//! let scope = TraceScope::current();
//!
//! let mut stopwatch = OperationStopwatch::start(&scope, &reads, ReadOpType::Find);
//! stopwatch.account_error(DriverErrorKind::Network);
//!
//! let snapshot = reads.snapshot();
//! assert_eq!(snapshot[ReadOpType::Find].count(ErrorType::Network), 1);
//! ```
//!
//! # Accounting rules
//!
//! An armed stopwatch records exactly one outcome: the one it is told about,
//! or `Other` if it is dropped first. Accounting never panics into the caller.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with a manual clock for deterministic latency
//!   in tests.
//! - **`failpoints`**: Compiles in the `stats-account` fail point used to inject panics into the
//!   accounting path.

#![deny(unsafe_code)]

pub mod aggregator;
pub mod config;
pub mod driver_log;
pub mod error;
pub mod error_type;
pub mod item;
pub mod latency;
pub mod scope_time;
pub mod stopwatch;
pub mod tables;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use aggregator::Aggregator;
pub use config::{AggregatorConfig, DEFAULT_RETAINED_WINDOWS, MAX_RETAINED_WINDOWS};
pub use driver_log::{DriverLogLevel, log_driver_message};
pub use error::{ConfigError, StatsError, StatsResult};
pub use error_type::{DriverErrorKind, ErrorType};
pub use item::{OperationStatisticsItem, OperationStatisticsSnapshot};
pub use latency::{LatencyAccumulator, LatencyPercentiles, LatencySnapshot};
pub use scope_time::{Clock, ScopeTime, TimeSource, TraceScope};
pub use stopwatch::{OperationStopwatch, PoolQueueStopwatch, PoolRequestStopwatch};
pub use tables::{
    OperationType, PoolConnectSnapshot, PoolConnectStatistics, PoolOpType, ReadOpType,
    ReadOperationStatistics, ReadStatisticsSnapshot, StatisticsTable, TableSnapshot, WriteOpType,
    WriteOperationStatistics, WriteStatisticsSnapshot,
};
