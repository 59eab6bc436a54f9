//! Deterministic time for tests.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::Span;

use crate::scope_time::{Clock, TimeSource, TraceScope};

/// A [`TimeSource`] that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self { base: Instant::now(), offset: Mutex::new(Duration::ZERO) }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// A scope with no span, timed by a fresh [`ManualClock`].
#[must_use]
pub fn manual_scope() -> (TraceScope, Arc<ManualClock>) {
    manual_scope_in(Span::none())
}

/// A scope bound to `span`, timed by a fresh [`ManualClock`].
#[must_use]
pub fn manual_scope_in(span: Span) -> (TraceScope, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let scope = TraceScope::with_clock(span, Clock::Custom(clock.clone()));
    (scope, clock)
}
