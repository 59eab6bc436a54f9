//! Statistics tables: fixed sets of per-operation items.
//!
//! Each table kind has its own operation enum ([`ReadOpType`], [`WriteOpType`],
//! [`PoolOpType`]) and implements [`StatisticsTable`], which is all the generic
//! [`Aggregator`](crate::Aggregator) and
//! [`OperationStopwatch`](crate::OperationStopwatch) need.
//!
//! Operation enums have no sentinel variant. Their `COUNT` constant plays that
//! role: it sizes the item arrays and is rejected by `TryFrom<usize>`, so it can
//! never index a slot or reach a label.

mod pool;
mod read;
mod write;

use std::{fmt, hash::Hash};

pub use pool::{PoolConnectSnapshot, PoolConnectStatistics, PoolOpType};
pub use read::{ReadOpType, ReadOperationStatistics, ReadStatisticsSnapshot};
pub use write::{WriteOpType, WriteOperationStatistics, WriteStatisticsSnapshot};

use crate::{
    error::StatsError,
    item::{OperationStatisticsItem, OperationStatisticsSnapshot},
};

/// Operation taxonomy of one statistics table.
pub trait OperationType:
    Copy
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + TryFrom<usize, Error = StatsError>
    + Send
    + Sync
    + 'static
{
    /// Number of real operation types; also the sentinel index.
    const COUNT: usize;

    /// Every operation type, in slot order.
    const ALL: &'static [Self];

    /// Slot index of this operation type.
    fn index(self) -> usize;

    /// Metric label of this operation type.
    fn as_str(self) -> &'static str;
}

/// A fixed table of [`OperationStatisticsItem`]s that stopwatches record into.
pub trait StatisticsTable: Default + Send + Sync + 'static {
    /// Operation taxonomy indexing this table.
    type OpType: OperationType;

    /// Plain-value copy of the table, used for export and merging.
    type Snapshot: TableSnapshot<OpType = Self::OpType>;

    /// Table name used in logs and errors.
    const NAME: &'static str;

    /// Item for `op_type`.
    fn item(&self, op_type: Self::OpType) -> &OperationStatisticsItem;

    /// Returns every counter and accumulator of the table to zero.
    fn reset(&self);

    /// Adds the table's current values into `snapshot`.
    fn accumulate(&self, snapshot: &mut Self::Snapshot);

    /// Copies the table's current values.
    fn snapshot(&self) -> Self::Snapshot {
        let mut snapshot = Self::Snapshot::default();
        self.accumulate(&mut snapshot);
        snapshot
    }
}

/// Snapshot of a [`StatisticsTable`].
pub trait TableSnapshot: Clone + Default + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Operation taxonomy indexing this snapshot.
    type OpType: OperationType;

    /// Item snapshot for `op_type`.
    fn item(&self, op_type: Self::OpType) -> &OperationStatisticsSnapshot;

    /// Folds `other` into this snapshot.
    fn merge(&mut self, other: &Self);
}

fn unknown_operation(table: &'static str, index: usize) -> StatsError {
    StatsError::UnknownOperationType { table, index }
}
