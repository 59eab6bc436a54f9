//! Stopwatches that time one operation and account its outcome.
//!
//! An [`OperationStopwatch`] is armed against an aggregator and an operation
//! type. It records exactly one outcome per armed period:
//!
//! - [`account_success`](OperationStopwatch::account_success) records `Success`,
//! - [`account_error`](OperationStopwatch::account_error) records the
//!   classified driver error,
//! - dropping it while still armed records `Other` (the operation was
//!   abandoned, e.g. its future was cancelled),
//! - [`discard`](OperationStopwatch::discard) records nothing.
//!
//! Stopwatches hold the shared aggregator, not a window. The window is looked
//! up when the outcome is recorded, so an operation outliving any number of
//! rotations still lands in the window that is current when it completes.
//!
//! Accounting never panics into the caller. A panic raised while recording is
//! caught, logged at `warn` and the sample is dropped.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use fail::fail_point;

use crate::{
    aggregator::Aggregator,
    error_type::{DriverErrorKind, ErrorType},
    latency::duration_to_ms,
    scope_time::{ScopeTime, TraceScope},
    tables::{OperationType, PoolConnectStatistics, StatisticsTable},
};

/// Sub-timer label of a connection request.
pub const CONN_WAIT_LABEL: &str = "conn-wait";

/// Sub-timer label of a throttled wait in the connection queue.
pub const CONN_THROTTLE_LABEL: &str = "conn-throttle";

/// Runs one accounting step, swallowing any panic it raises.
fn guarded(what: &'static str, account: impl FnOnce()) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        fail_point!("stats-account");
        account();
    }));
    if result.is_err() {
        tracing::warn!(accounting = what, "Statistics accounting panicked; sample dropped");
    }
}

struct Binding<T: StatisticsTable> {
    aggregator: Arc<Aggregator<T>>,
    op_type: T::OpType,
}

impl<T: StatisticsTable> Binding<T> {
    /// Records into the window current at call time. The guard keeps the
    /// window alive until both updates are done.
    fn record(&self, outcome: ErrorType, elapsed: Duration) {
        let window = self.aggregator.current();
        let item = window.item(self.op_type);
        item.record_outcome(outcome);
        item.record_duration(elapsed);
    }
}

/// Times one operation against an [`Aggregator`] and accounts its outcome.
pub struct OperationStopwatch<T: StatisticsTable> {
    timer: ScopeTime,
    binding: Option<Binding<T>>,
}

impl<T: StatisticsTable> OperationStopwatch<T> {
    /// Creates an unarmed stopwatch. Its timer runs but nothing is recorded
    /// until it is armed with [`reset`](Self::reset).
    #[must_use]
    pub fn new(scope: &TraceScope) -> Self {
        Self { timer: scope.create_scope_time(), binding: None }
    }

    /// Creates a stopwatch armed for `op_type` against `aggregator`.
    #[must_use]
    pub fn start(
        scope: &TraceScope,
        aggregator: &Arc<Aggregator<T>>,
        op_type: T::OpType,
    ) -> Self {
        Self {
            timer: scope.create_named_scope_time(op_type.as_str()),
            binding: Some(Binding { aggregator: Arc::clone(aggregator), op_type }),
        }
    }

    /// Re-arms the stopwatch for `op_type` and restarts its timer.
    ///
    /// A stopwatch that is still armed first accounts `Other` for the
    /// operation it was bound to.
    pub fn reset(&mut self, aggregator: &Arc<Aggregator<T>>, op_type: T::OpType) {
        let prior = self.binding.take();
        guarded("reset", || {
            let elapsed = self.timer.reset_named(op_type.as_str());
            if let Some(prior) = prior {
                prior.record(ErrorType::Other, elapsed);
            }
        });
        self.binding = Some(Binding { aggregator: Arc::clone(aggregator), op_type });
    }

    /// Accounts a successful completion. No-op if unarmed.
    pub fn account_success(&mut self) {
        self.account(ErrorType::Success);
    }

    /// Accounts a failed completion. No-op if unarmed.
    pub fn account_error(&mut self, kind: DriverErrorKind) {
        self.account(ErrorType::classify(kind));
    }

    /// Disarms the stopwatch without recording anything.
    pub fn discard(&mut self) {
        self.binding = None;
        self.timer.discard();
    }

    /// Whether an outcome will be recorded for the current operation.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.binding.is_some()
    }

    /// Operation type the stopwatch is armed for.
    #[must_use]
    pub fn operation(&self) -> Option<T::OpType> {
        self.binding.as_ref().map(|binding| binding.op_type)
    }

    fn account(&mut self, outcome: ErrorType) {
        let Some(binding) = self.binding.take() else {
            return;
        };
        guarded("operation", || {
            let elapsed = self.timer.reset();
            binding.record(outcome, elapsed);
        });
    }
}

impl<T: StatisticsTable> Drop for OperationStopwatch<T> {
    fn drop(&mut self) {
        self.account(ErrorType::Other);
    }
}

impl<T: StatisticsTable> std::fmt::Debug for OperationStopwatch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationStopwatch")
            .field("table", &T::NAME)
            .field("operation", &self.operation())
            .finish_non_exhaustive()
    }
}

/// Times a request for a pooled connection.
///
/// Dropping it counts one request and records its duration into the pool's
/// request latency distribution.
#[derive(Debug)]
pub struct PoolRequestStopwatch {
    timer: ScopeTime,
    aggregator: Arc<Aggregator<PoolConnectStatistics>>,
}

impl PoolRequestStopwatch {
    /// Starts timing a connection request.
    #[must_use]
    pub fn new(scope: &TraceScope, aggregator: &Arc<Aggregator<PoolConnectStatistics>>) -> Self {
        Self {
            timer: scope.create_named_scope_time(CONN_WAIT_LABEL),
            aggregator: Arc::clone(aggregator),
        }
    }
}

impl Drop for PoolRequestStopwatch {
    fn drop(&mut self) {
        guarded("pool-request", || {
            let elapsed = self.timer.reset();
            self.aggregator.current().record_request(duration_to_ms(elapsed));
        });
    }
}

/// Times a throttled wait in the connection queue.
///
/// Records one sample into the pool's queue-wait distribution, either on
/// [`stop`](Self::stop) or on drop, whichever comes first.
#[derive(Debug)]
pub struct PoolQueueStopwatch {
    timer: ScopeTime,
    aggregator: Option<Arc<Aggregator<PoolConnectStatistics>>>,
}

impl PoolQueueStopwatch {
    /// Starts timing a queue wait.
    #[must_use]
    pub fn new(scope: &TraceScope, aggregator: &Arc<Aggregator<PoolConnectStatistics>>) -> Self {
        Self {
            timer: scope.create_named_scope_time(CONN_THROTTLE_LABEL),
            aggregator: Some(Arc::clone(aggregator)),
        }
    }

    /// Records the wait. Later calls and the eventual drop record nothing.
    pub fn stop(&mut self) {
        let Some(aggregator) = self.aggregator.take() else {
            return;
        };
        guarded("pool-queue", || {
            let elapsed = self.timer.reset();
            aggregator.current().record_queue_wait(duration_to_ms(elapsed));
        });
    }

    /// Whether the wait has already been recorded.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.aggregator.is_none()
    }
}

impl Drop for PoolQueueStopwatch {
    fn drop(&mut self) {
        self.stop();
    }
}
