//! Statistics table for write operations.

use std::{fmt, ops::Index};

use super::{OperationType, StatisticsTable, TableSnapshot, unknown_operation};
use crate::{
    error::StatsError,
    item::{OperationStatisticsItem, OperationStatisticsSnapshot},
};

/// Write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOpType {
    /// Single document insert.
    InsertOne,
    /// Multi-document insert.
    InsertMany,
    /// Whole-document replacement.
    ReplaceOne,
    /// Update of the first matching document.
    UpdateOne,
    /// Update of all matching documents.
    UpdateMany,
    /// Delete of the first matching document.
    DeleteOne,
    /// Delete of all matching documents.
    DeleteMany,
    /// Atomic find-and-update.
    FindAndModify,
    /// Atomic find-and-delete.
    FindAndRemove,
    /// Bulk write.
    Bulk,
}

impl WriteOpType {
    /// Number of write operation types.
    pub const COUNT: usize = 10;
}

impl OperationType for WriteOpType {
    const COUNT: usize = Self::COUNT;
    const ALL: &'static [Self] = &[
        Self::InsertOne,
        Self::InsertMany,
        Self::ReplaceOne,
        Self::UpdateOne,
        Self::UpdateMany,
        Self::DeleteOne,
        Self::DeleteMany,
        Self::FindAndModify,
        Self::FindAndRemove,
        Self::Bulk,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::InsertOne => "insert-one",
            Self::InsertMany => "insert-many",
            Self::ReplaceOne => "replace-one",
            Self::UpdateOne => "update-one",
            Self::UpdateMany => "update-many",
            Self::DeleteOne => "delete-one",
            Self::DeleteMany => "delete-many",
            Self::FindAndModify => "find-and-modify",
            Self::FindAndRemove => "find-and-remove",
            Self::Bulk => "bulk",
        }
    }
}

impl TryFrom<usize> for WriteOpType {
    type Error = StatsError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| unknown_operation(WriteOperationStatistics::NAME, index))
    }
}

impl fmt::Display for WriteOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics of write operations.
#[derive(Debug)]
pub struct WriteOperationStatistics {
    items: [OperationStatisticsItem; WriteOpType::COUNT],
}

impl Default for WriteOperationStatistics {
    fn default() -> Self {
        Self { items: std::array::from_fn(|_| OperationStatisticsItem::new()) }
    }
}

impl StatisticsTable for WriteOperationStatistics {
    type OpType = WriteOpType;
    type Snapshot = WriteStatisticsSnapshot;

    const NAME: &'static str = "write";

    fn item(&self, op_type: WriteOpType) -> &OperationStatisticsItem {
        &self.items[op_type.index()]
    }

    fn reset(&self) {
        for item in &self.items {
            item.reset();
        }
    }

    fn accumulate(&self, snapshot: &mut WriteStatisticsSnapshot) {
        for (item, dst) in self.items.iter().zip(snapshot.items.iter_mut()) {
            item.accumulate(dst);
        }
    }
}

impl Index<WriteOpType> for WriteOperationStatistics {
    type Output = OperationStatisticsItem;

    fn index(&self, op_type: WriteOpType) -> &OperationStatisticsItem {
        self.item(op_type)
    }
}

/// Snapshot of [`WriteOperationStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteStatisticsSnapshot {
    /// Item snapshots indexed by [`WriteOpType`].
    pub items: [OperationStatisticsSnapshot; WriteOpType::COUNT],
}

impl TableSnapshot for WriteStatisticsSnapshot {
    type OpType = WriteOpType;

    fn item(&self, op_type: WriteOpType) -> &OperationStatisticsSnapshot {
        &self.items[op_type.index()]
    }

    fn merge(&mut self, other: &Self) {
        for (dst, src) in self.items.iter_mut().zip(&other.items) {
            dst.merge(src);
        }
    }
}

impl Index<WriteOpType> for WriteStatisticsSnapshot {
    type Output = OperationStatisticsSnapshot;

    fn index(&self, op_type: WriteOpType) -> &OperationStatisticsSnapshot {
        self.item(op_type)
    }
}
