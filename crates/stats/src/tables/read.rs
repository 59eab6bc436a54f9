//! Statistics table for read operations (counts, finds and cursor batches).

use std::{fmt, ops::Index};

use super::{OperationType, StatisticsTable, TableSnapshot, unknown_operation};
use crate::{
    error::StatsError,
    item::{OperationStatisticsItem, OperationStatisticsSnapshot},
};

/// Read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadOpType {
    /// Exact document count.
    Count,
    /// Estimated document count from collection metadata.
    CountApprox,
    /// Query returning a cursor.
    Find,
    /// Fetch of the next cursor batch.
    GetMore,
}

impl ReadOpType {
    /// Number of read operation types.
    pub const COUNT: usize = 4;
}

impl OperationType for ReadOpType {
    const COUNT: usize = Self::COUNT;
    const ALL: &'static [Self] = &[Self::Count, Self::CountApprox, Self::Find, Self::GetMore];

    fn index(self) -> usize {
        self as usize
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::CountApprox => "count-approx",
            Self::Find => "find",
            Self::GetMore => "getmore",
        }
    }
}

impl TryFrom<usize> for ReadOpType {
    type Error = StatsError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| unknown_operation(ReadOperationStatistics::NAME, index))
    }
}

impl fmt::Display for ReadOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics of read operations.
#[derive(Debug)]
pub struct ReadOperationStatistics {
    items: [OperationStatisticsItem; ReadOpType::COUNT],
}

impl Default for ReadOperationStatistics {
    fn default() -> Self {
        Self { items: std::array::from_fn(|_| OperationStatisticsItem::new()) }
    }
}

impl StatisticsTable for ReadOperationStatistics {
    type OpType = ReadOpType;
    type Snapshot = ReadStatisticsSnapshot;

    const NAME: &'static str = "read";

    fn item(&self, op_type: ReadOpType) -> &OperationStatisticsItem {
        &self.items[op_type.index()]
    }

    fn reset(&self) {
        for item in &self.items {
            item.reset();
        }
    }

    fn accumulate(&self, snapshot: &mut ReadStatisticsSnapshot) {
        for (item, dst) in self.items.iter().zip(snapshot.items.iter_mut()) {
            item.accumulate(dst);
        }
    }
}

impl Index<ReadOpType> for ReadOperationStatistics {
    type Output = OperationStatisticsItem;

    fn index(&self, op_type: ReadOpType) -> &OperationStatisticsItem {
        self.item(op_type)
    }
}

/// Snapshot of [`ReadOperationStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadStatisticsSnapshot {
    /// Item snapshots indexed by [`ReadOpType`].
    pub items: [OperationStatisticsSnapshot; ReadOpType::COUNT],
}

impl TableSnapshot for ReadStatisticsSnapshot {
    type OpType = ReadOpType;

    fn item(&self, op_type: ReadOpType) -> &OperationStatisticsSnapshot {
        &self.items[op_type.index()]
    }

    fn merge(&mut self, other: &Self) {
        for (dst, src) in self.items.iter_mut().zip(&other.items) {
            dst.merge(src);
        }
    }
}

impl Index<ReadOpType> for ReadStatisticsSnapshot {
    type Output = OperationStatisticsSnapshot;

    fn index(&self, op_type: ReadOpType) -> &OperationStatisticsSnapshot {
        self.item(op_type)
    }
}
