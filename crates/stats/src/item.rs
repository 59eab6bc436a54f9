//! Per-operation-type counters.

use std::{
    ops::Index,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use crate::{
    error_type::ErrorType,
    latency::{LatencyAccumulator, LatencySnapshot},
};

/// Outcome counters and latency distribution for one operation type.
///
/// All updates are single atomic increments, so any number of stopwatches may
/// record into the same item concurrently.
#[derive(Debug)]
pub struct OperationStatisticsItem {
    counters: [AtomicU64; ErrorType::COUNT],
    timings: LatencyAccumulator,
}

impl OperationStatisticsItem {
    /// Creates a zeroed item.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: std::array::from_fn(|_| AtomicU64::new(0)),
            timings: LatencyAccumulator::new(),
        }
    }

    /// Increments the counter for `error_type` by one.
    pub fn record_outcome(&self, error_type: ErrorType) {
        self.counters[error_type.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Records one latency sample in milliseconds.
    pub fn record_latency(&self, ms: u64) {
        self.timings.record(ms);
    }

    /// Records one latency sample given as a duration.
    pub fn record_duration(&self, duration: Duration) {
        self.timings.record_duration(duration);
    }

    /// Current value of the counter for `error_type`.
    #[must_use]
    pub fn count(&self, error_type: ErrorType) -> u64 {
        self.counters[error_type.index()].load(Ordering::Relaxed)
    }

    /// Latency distribution of this operation type.
    #[must_use]
    pub fn timings(&self) -> &LatencyAccumulator {
        &self.timings
    }

    /// Zeroes every counter and discards all latency samples.
    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
        self.timings.reset();
    }

    /// Adds this item's values into `snapshot`.
    pub fn accumulate(&self, snapshot: &mut OperationStatisticsSnapshot) {
        for (dst, src) in snapshot.counters.iter_mut().zip(&self.counters) {
            *dst += src.load(Ordering::Relaxed);
        }
        self.timings.accumulate(&mut snapshot.timings);
    }

    /// Copies the current values.
    #[must_use]
    pub fn snapshot(&self) -> OperationStatisticsSnapshot {
        let mut snapshot = OperationStatisticsSnapshot::default();
        self.accumulate(&mut snapshot);
        snapshot
    }
}

impl Default for OperationStatisticsItem {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of an [`OperationStatisticsItem`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStatisticsSnapshot {
    /// Outcome counters indexed by [`ErrorType::index`].
    pub counters: [u64; ErrorType::COUNT],
    /// Latency distribution.
    pub timings: LatencySnapshot,
}

impl OperationStatisticsSnapshot {
    /// Counter value for `error_type`.
    #[must_use]
    pub fn count(&self, error_type: ErrorType) -> u64 {
        self.counters[error_type.index()]
    }

    /// Total accounted operations across all outcomes.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counters.iter().sum()
    }

    /// Accounted operations that did not succeed.
    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.total() - self.count(ErrorType::Success)
    }

    /// Error rate (0.0 - 1.0), or `0.0` when nothing was accounted.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 { 0.0 } else { self.error_count() as f64 / total as f64 }
    }

    /// Folds `other` into this snapshot.
    pub fn merge(&mut self, other: &Self) {
        for (dst, src) in self.counters.iter_mut().zip(&other.counters) {
            *dst += src;
        }
        self.timings.merge(&other.timings);
    }
}

impl Index<ErrorType> for OperationStatisticsSnapshot {
    type Output = u64;

    fn index(&self, error_type: ErrorType) -> &u64 {
        &self.counters[error_type.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcome_increments_one_counter() {
        let item = OperationStatisticsItem::new();
        item.record_outcome(ErrorType::DuplicateKey);
        item.record_outcome(ErrorType::DuplicateKey);
        item.record_outcome(ErrorType::Success);

        for error_type in ErrorType::ALL {
            let expected = match error_type {
                ErrorType::DuplicateKey => 2,
                ErrorType::Success => 1,
                _ => 0,
            };
            assert_eq!(item.count(error_type), expected, "{error_type}");
        }
    }

    #[test]
    fn test_snapshot_totals_and_rates() {
        let item = OperationStatisticsItem::new();
        for _ in 0..3 {
            item.record_outcome(ErrorType::Success);
        }
        item.record_outcome(ErrorType::Network);
        item.record_latency(10);

        let snapshot = item.snapshot();
        assert_eq!(snapshot.total(), 4);
        assert_eq!(snapshot.error_count(), 1);
        assert_eq!(snapshot.error_rate(), 0.25);
        assert_eq!(snapshot[ErrorType::Network], 1);
        assert_eq!(snapshot.timings.count(), 1);
    }

    #[test]
    fn test_reset_matches_fresh_item() {
        let item = OperationStatisticsItem::new();
        item.record_outcome(ErrorType::Other);
        item.record_duration(Duration::from_millis(7));
        item.reset();
        assert_eq!(item.snapshot(), OperationStatisticsItem::new().snapshot());
    }

    #[test]
    fn test_zero_total_error_rate() {
        assert_eq!(OperationStatisticsSnapshot::default().error_rate(), 0.0);
    }

    #[test]
    fn test_merge_adds_counters() {
        let a = OperationStatisticsItem::new();
        let b = OperationStatisticsItem::new();
        a.record_outcome(ErrorType::Success);
        b.record_outcome(ErrorType::Success);
        b.record_outcome(ErrorType::Server);

        let mut merged = a.snapshot();
        merged.merge(&b.snapshot());
        assert_eq!(merged.count(ErrorType::Success), 2);
        assert_eq!(merged.count(ErrorType::Server), 1);
    }
}
