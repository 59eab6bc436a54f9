//! Shared, rotatable statistics windows.
//!
//! An [`Aggregator`] owns the *current* statistics table that every stopwatch
//! records into, plus a short history of rotated-out tables kept for export.
//!
//! Reading the current table is a lock-free [`ArcSwap`] load. Stopwatches
//! resolve the current table only when they record, and hold the load guard
//! for the duration of the increment. An increment racing a rotation lands in
//! the just-retired window, which is in the history (or returned by
//! [`Aggregator::rotate`]) and shows up in [`Aggregator::merged_snapshot`].

use std::{
    collections::VecDeque,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use arc_swap::{ArcSwap, Guard};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::{AggregatorConfig, MAX_RETAINED_WINDOWS},
    tables::{OperationType, StatisticsTable, TableSnapshot},
};

/// Error rate above which [`Aggregator::log_statistics`] warns.
const HIGH_ERROR_RATE: f64 = 0.05;

/// Current statistics window of one table kind plus its retained history.
pub struct Aggregator<T: StatisticsTable> {
    current: ArcSwap<T>,
    /// Rotated-out windows, newest first. Only taken by rotation and export.
    history: Mutex<VecDeque<Arc<T>>>,
    retained_windows: usize,
    generation: AtomicU64,
}

impl<T: StatisticsTable> Aggregator<T> {
    /// Creates an aggregator with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&AggregatorConfig::default())
    }

    /// Creates an aggregator from `config`.
    ///
    /// A `retained_windows` above [`MAX_RETAINED_WINDOWS`] is clamped.
    #[must_use]
    pub fn with_config(config: &AggregatorConfig) -> Self {
        let mut retained_windows = config.retained_windows();
        if retained_windows > MAX_RETAINED_WINDOWS {
            warn!(
                table = T::NAME,
                retained_windows,
                max = MAX_RETAINED_WINDOWS,
                "Clamping retained statistics windows"
            );
            retained_windows = MAX_RETAINED_WINDOWS;
        }

        Self {
            current: ArcSwap::from_pointee(T::default()),
            history: Mutex::new(VecDeque::with_capacity(retained_windows)),
            retained_windows,
            generation: AtomicU64::new(0),
        }
    }

    /// The table stopwatches currently record into.
    ///
    /// Lock-free. The guard is meant for short use; call
    /// [`current_counter`](Self::current_counter) to hold the window longer.
    pub fn current(&self) -> Guard<Arc<T>> {
        self.current.load()
    }

    /// Pins the current table.
    #[must_use]
    pub fn current_counter(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Installs a fresh zeroed window and returns the retired one.
    ///
    /// The retired window is pushed to the front of the history, which is then
    /// trimmed to the configured number of retained windows. A window evicted
    /// by the trim is zeroed and reused as the new current window when nothing
    /// else still references it.
    pub fn rotate(&self) -> Arc<T> {
        let mut history = self.history.lock();

        let evicted = if self.retained_windows > 0 && history.len() >= self.retained_windows {
            history.pop_back()
        } else {
            None
        };
        let fresh = evicted.and_then(recycle).unwrap_or_else(|| Arc::new(T::default()));

        let retired = self.current.swap(fresh);
        if self.retained_windows > 0 {
            history.push_front(Arc::clone(&retired));
            history.truncate(self.retained_windows);
        }
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        drop(history);

        debug!(table = T::NAME, generation, "Rotated statistics window");
        retired
    }

    /// The most recently retired window, if any is retained.
    #[must_use]
    pub fn previous(&self) -> Option<Arc<T>> {
        self.history.lock().front().cloned()
    }

    /// Retained windows, newest first. Does not include the current window.
    #[must_use]
    pub fn windows(&self) -> Vec<Arc<T>> {
        self.history.lock().iter().cloned().collect()
    }

    /// Snapshot of the current window.
    #[must_use]
    pub fn snapshot(&self) -> T::Snapshot {
        self.current.load().snapshot()
    }

    /// Snapshot of the current window merged with every retained window.
    #[must_use]
    pub fn merged_snapshot(&self) -> T::Snapshot {
        let mut snapshot = self.snapshot();
        for window in self.history.lock().iter() {
            window.accumulate(&mut snapshot);
        }
        snapshot
    }

    /// Number of rotations performed.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Number of rotated-out windows kept.
    #[must_use]
    pub fn retained_windows(&self) -> usize {
        self.retained_windows
    }

    /// Zeroes the current window in place and drops the retained history.
    pub fn reset(&self) {
        let mut history = self.history.lock();
        history.clear();
        self.current.load().reset();
    }

    /// Logs per-operation totals and latency percentiles of the current window.
    ///
    /// Operations with no accounted calls are skipped. Emits a warning for each
    /// operation whose error rate exceeds 5%.
    pub fn log_statistics(&self) {
        let snapshot = self.snapshot();

        for &op_type in T::OpType::ALL {
            let item = snapshot.item(op_type);
            let total = item.total();
            if total == 0 {
                continue;
            }

            let percentiles = item.timings.percentiles();
            info!(
                table = T::NAME,
                operation = op_type.as_str(),
                total,
                error_count = item.error_count(),
                error_rate = item.error_rate(),
                avg_latency_ms = item.timings.average_ms(),
                max_latency_ms = item.timings.max_ms(),
                p50 = percentiles.p50,
                p95 = percentiles.p95,
                p99 = percentiles.p99,
                "Operation statistics"
            );

            if item.error_rate() > HIGH_ERROR_RATE {
                warn!(
                    table = T::NAME,
                    operation = op_type.as_str(),
                    error_rate = item.error_rate(),
                    error_count = item.error_count(),
                    total,
                    "High operation error rate detected"
                );
            }
        }
    }
}

/// Zeroes `window` for reuse if this is its only reference.
fn recycle<T: StatisticsTable>(mut window: Arc<T>) -> Option<Arc<T>> {
    Arc::get_mut(&mut window)?;
    window.reset();
    Some(window)
}

impl<T: StatisticsTable> Default for Aggregator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StatisticsTable> fmt::Debug for Aggregator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("table", &T::NAME)
            .field("generation", &self.generation())
            .field("retained_windows", &self.retained_windows)
            .finish_non_exhaustive()
    }
}
