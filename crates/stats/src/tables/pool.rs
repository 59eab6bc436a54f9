//! Connection pool statistics.
//!
//! Besides the per-operation items, the pool table keeps checkout request and
//! queue wait timings plus connection lifecycle counters.

use std::{
    fmt,
    ops::Index,
    sync::atomic::{AtomicU64, Ordering},
};

use super::{OperationType, StatisticsTable, TableSnapshot, unknown_operation};
use crate::{
    error::StatsError,
    item::{OperationStatisticsItem, OperationStatisticsSnapshot},
    latency::{LatencyAccumulator, LatencySnapshot},
};

/// Connection pool operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolOpType {
    /// Liveness ping of a pooled connection.
    Ping,
}

impl PoolOpType {
    /// Number of pool operation types.
    pub const COUNT: usize = 1;
}

impl OperationType for PoolOpType {
    const COUNT: usize = Self::COUNT;
    const ALL: &'static [Self] = &[Self::Ping];

    fn index(self) -> usize {
        self as usize
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
        }
    }
}

impl TryFrom<usize> for PoolOpType {
    type Error = StatsError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| unknown_operation(PoolConnectStatistics::NAME, index))
    }
}

impl fmt::Display for PoolOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection pool statistics.
///
/// Besides the per-operation items, the pool tracks connection lifecycle
/// counters and two latency distributions: time to obtain a connection
/// (`request_timings`) and time spent throttled in the wait queue
/// (`queue_wait_timings`).
#[derive(Debug)]
pub struct PoolConnectStatistics {
    items: [OperationStatisticsItem; PoolOpType::COUNT],
    requested: AtomicU64,
    created: AtomicU64,
    closed: AtomicU64,
    overload: AtomicU64,
    request_timings: LatencyAccumulator,
    queue_wait_timings: LatencyAccumulator,
}

impl Default for PoolConnectStatistics {
    fn default() -> Self {
        Self {
            items: std::array::from_fn(|_| OperationStatisticsItem::new()),
            requested: AtomicU64::new(0),
            created: AtomicU64::new(0),
            closed: AtomicU64::new(0),
            overload: AtomicU64::new(0),
            request_timings: LatencyAccumulator::new(),
            queue_wait_timings: LatencyAccumulator::new(),
        }
    }
}

impl PoolConnectStatistics {
    /// Records a connection request and the time it took to serve it.
    pub fn record_request(&self, ms: u64) {
        self.requested.fetch_add(1, Ordering::Relaxed);
        self.request_timings.record(ms);
    }

    /// Records time spent waiting in the connection queue.
    pub fn record_queue_wait(&self, ms: u64) {
        self.queue_wait_timings.record(ms);
    }

    /// Records a newly established connection.
    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a closed connection.
    pub fn record_closed(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a request rejected because the pool was saturated.
    pub fn record_overload(&self) {
        self.overload.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of connection requests.
    #[must_use]
    pub fn requested(&self) -> u64 {
        self.requested.load(Ordering::Relaxed)
    }

    /// Number of connections created.
    #[must_use]
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of connections closed.
    #[must_use]
    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::Relaxed)
    }

    /// Number of requests rejected on overload.
    #[must_use]
    pub fn overload(&self) -> u64 {
        self.overload.load(Ordering::Relaxed)
    }

    /// Connection request latency distribution.
    #[must_use]
    pub fn request_timings(&self) -> &LatencyAccumulator {
        &self.request_timings
    }

    /// Queue wait latency distribution.
    #[must_use]
    pub fn queue_wait_timings(&self) -> &LatencyAccumulator {
        &self.queue_wait_timings
    }
}

impl StatisticsTable for PoolConnectStatistics {
    type OpType = PoolOpType;
    type Snapshot = PoolConnectSnapshot;

    const NAME: &'static str = "pool";

    fn item(&self, op_type: PoolOpType) -> &OperationStatisticsItem {
        &self.items[op_type.index()]
    }

    fn reset(&self) {
        self.requested.store(0, Ordering::Relaxed);
        self.created.store(0, Ordering::Relaxed);
        self.closed.store(0, Ordering::Relaxed);
        self.overload.store(0, Ordering::Relaxed);
        for item in &self.items {
            item.reset();
        }
        self.request_timings.reset();
        self.queue_wait_timings.reset();
    }

    fn accumulate(&self, snapshot: &mut PoolConnectSnapshot) {
        for (item, dst) in self.items.iter().zip(snapshot.items.iter_mut()) {
            item.accumulate(dst);
        }
        snapshot.requested += self.requested.load(Ordering::Relaxed);
        snapshot.created += self.created.load(Ordering::Relaxed);
        snapshot.closed += self.closed.load(Ordering::Relaxed);
        snapshot.overload += self.overload.load(Ordering::Relaxed);
        self.request_timings.accumulate(&mut snapshot.request_timings);
        self.queue_wait_timings.accumulate(&mut snapshot.queue_wait_timings);
    }
}

impl Index<PoolOpType> for PoolConnectStatistics {
    type Output = OperationStatisticsItem;

    fn index(&self, op_type: PoolOpType) -> &OperationStatisticsItem {
        self.item(op_type)
    }
}

/// Snapshot of [`PoolConnectStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolConnectSnapshot {
    /// Item snapshots indexed by [`PoolOpType`].
    pub items: [OperationStatisticsSnapshot; PoolOpType::COUNT],
    /// Connection requests.
    pub requested: u64,
    /// Connections created.
    pub created: u64,
    /// Connections closed.
    pub closed: u64,
    /// Requests rejected on overload.
    pub overload: u64,
    /// Connection request latency.
    pub request_timings: LatencySnapshot,
    /// Queue wait latency.
    pub queue_wait_timings: LatencySnapshot,
}

impl TableSnapshot for PoolConnectSnapshot {
    type OpType = PoolOpType;

    fn item(&self, op_type: PoolOpType) -> &OperationStatisticsSnapshot {
        &self.items[op_type.index()]
    }

    fn merge(&mut self, other: &Self) {
        for (dst, src) in self.items.iter_mut().zip(&other.items) {
            dst.merge(src);
        }
        self.requested += other.requested;
        self.created += other.created;
        self.closed += other.closed;
        self.overload += other.overload;
        self.request_timings.merge(&other.request_timings);
        self.queue_wait_timings.merge(&other.queue_wait_timings);
    }
}

impl Index<PoolOpType> for PoolConnectSnapshot {
    type Output = OperationStatisticsSnapshot;

    fn index(&self, op_type: PoolOpType) -> &OperationStatisticsSnapshot {
        self.item(op_type)
    }
}
