//! Lock-free latency distribution accumulator.
//!
//! Samples are whole milliseconds. Each [`LatencyAccumulator`] keeps a fixed
//! array of atomic bucket counters:
//!
//! - 1024 one-millisecond buckets covering `0..1024` ms
//! - 32 buckets of 100 ms covering `1024..4224` ms; anything slower saturates into the last
//!   bucket
//!
//! Recording is two `fetch_add`s, one `fetch_max` and a saturating
//! `fetch_update` of the sum, all `Relaxed`, so it never blocks and never
//! allocates. Percentiles are computed from a
//! [`LatencySnapshot`], which copies the buckets once and can be merged with
//! snapshots of other windows.
//!
//! # Memory Ordering
//!
//! Buckets and totals are independent monotonic counters. A snapshot taken
//! while samples are being recorded may see a bucket increment before the
//! matching `count` increment; percentile math therefore uses the bucket sum,
//! never `count`.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Number of one-millisecond buckets.
const DIRECT_BUCKETS: usize = 1024;

/// Number of coarse buckets after the direct range.
const EXTRA_BUCKETS: usize = 32;

/// Width of a coarse bucket in milliseconds.
const EXTRA_BUCKET_WIDTH_MS: u64 = 100;

/// Total number of buckets in an accumulator.
pub const BUCKET_COUNT: usize = DIRECT_BUCKETS + EXTRA_BUCKETS;

fn bucket_index(ms: u64) -> usize {
    if ms < DIRECT_BUCKETS as u64 {
        return ms as usize;
    }
    let extra = ((ms - DIRECT_BUCKETS as u64) / EXTRA_BUCKET_WIDTH_MS)
        .min(EXTRA_BUCKETS as u64 - 1);
    DIRECT_BUCKETS + extra as usize
}

/// Lower bound, in milliseconds, of the bucket at `index`.
fn bucket_floor_ms(index: usize) -> u64 {
    if index < DIRECT_BUCKETS {
        index as u64
    } else {
        DIRECT_BUCKETS as u64 + (index - DIRECT_BUCKETS) as u64 * EXTRA_BUCKET_WIDTH_MS
    }
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
#[must_use]
pub fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Latency percentiles in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyPercentiles {
    /// 50th percentile (median).
    pub p50: u64,
    /// 95th percentile.
    pub p95: u64,
    /// 99th percentile.
    pub p99: u64,
}

/// Concurrent accumulator of millisecond latency samples.
#[derive(Debug)]
pub struct LatencyAccumulator {
    buckets: Box<[AtomicU64]>,
    count: AtomicU64,
    sum_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: (0..BUCKET_COUNT).map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum_ms: AtomicU64::new(0),
            max_ms: AtomicU64::new(0),
        }
    }

    /// Records one sample.
    pub fn record(&self, ms: u64) {
        self.buckets[bucket_index(ms)].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        // Saturates instead of wrapping; a wrapped sum would corrupt the average.
        let _ = self.sum_ms.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |sum| {
            Some(sum.saturating_add(ms))
        });
        self.max_ms.fetch_max(ms, Ordering::Relaxed);
    }

    /// Records one sample given as a duration.
    pub fn record_duration(&self, duration: Duration) {
        self.record(duration_to_ms(duration));
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Discards all samples.
    pub fn reset(&self) {
        for bucket in self.buckets.iter() {
            bucket.store(0, Ordering::Relaxed);
        }
        self.count.store(0, Ordering::Relaxed);
        self.sum_ms.store(0, Ordering::Relaxed);
        self.max_ms.store(0, Ordering::Relaxed);
    }

    /// Adds this accumulator's samples into `snapshot`.
    pub fn accumulate(&self, snapshot: &mut LatencySnapshot) {
        for (dst, src) in snapshot.buckets.iter_mut().zip(self.buckets.iter()) {
            *dst += src.load(Ordering::Relaxed);
        }
        snapshot.count += self.count.load(Ordering::Relaxed);
        snapshot.sum_ms = snapshot.sum_ms.saturating_add(self.sum_ms.load(Ordering::Relaxed));
        snapshot.max_ms = snapshot.max_ms.max(self.max_ms.load(Ordering::Relaxed));
    }

    /// Copies the current distribution.
    #[must_use]
    pub fn snapshot(&self) -> LatencySnapshot {
        let mut snapshot = LatencySnapshot::default();
        self.accumulate(&mut snapshot);
        snapshot
    }
}

impl Default for LatencyAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a latency distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencySnapshot {
    buckets: Vec<u64>,
    count: u64,
    sum_ms: u64,
    max_ms: u64,
}

impl Default for LatencySnapshot {
    fn default() -> Self {
        Self { buckets: vec![0; BUCKET_COUNT], count: 0, sum_ms: 0, max_ms: 0 }
    }
}

impl LatencySnapshot {
    /// Number of samples.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all samples in milliseconds.
    #[must_use]
    pub fn sum_ms(&self) -> u64 {
        self.sum_ms
    }

    /// Largest sample in milliseconds.
    #[must_use]
    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Returns `true` when no samples were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|&b| b == 0)
    }

    /// Mean sample in milliseconds, or `0.0` when empty.
    #[must_use]
    pub fn average_ms(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.sum_ms as f64 / self.count as f64 }
    }

    /// Nearest-rank percentile in milliseconds.
    ///
    /// Samples in coarse buckets report the bucket's lower bound. Returns `0`
    /// for an empty distribution; `percent` is clamped to `100`.
    #[must_use]
    pub fn percentile(&self, percent: u32) -> u64 {
        let total: u64 = self.buckets.iter().sum();
        if total == 0 {
            return 0;
        }
        let rank = (u64::from(percent.min(100)) * total).div_ceil(100).max(1);
        let mut seen = 0;
        for (index, &bucket) in self.buckets.iter().enumerate() {
            seen += bucket;
            if seen >= rank {
                return bucket_floor_ms(index);
            }
        }
        bucket_floor_ms(BUCKET_COUNT - 1)
    }

    /// p50, p95 and p99 of this distribution.
    #[must_use]
    pub fn percentiles(&self) -> LatencyPercentiles {
        LatencyPercentiles {
            p50: self.percentile(50),
            p95: self.percentile(95),
            p99: self.percentile(99),
        }
    }

    /// Folds `other` into this snapshot.
    pub fn merge(&mut self, other: &Self) {
        for (dst, src) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *dst += src;
        }
        self.count += other.count;
        self.sum_ms = self.sum_ms.saturating_add(other.sum_ms);
        self.max_ms = self.max_ms.max(other.max_ms);
    }
}
