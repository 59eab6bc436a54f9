//! Trace-scope timing handles.
//!
//! A [`TraceScope`] is the caller's unit of work: a [`tracing::Span`] plus the
//! clock used to time sub-operations inside it. Stopwatches take the scope as
//! an explicit argument instead of looking up an ambient "current span", which
//! keeps the dependency visible and lets tests drive time with a manual clock.
//!
//! A [`ScopeTime`] measures one named sub-operation at a time. When a named
//! measurement completes it is reported as a `TRACE` event on the scope's span:
//!
//! ```text
//! target: dbclient_stats::scope  fields: scope="find" elapsed_ms=3
//! ```
//!
//! Discarded measurements report nothing.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::Span;

use crate::latency::duration_to_ms;

/// Source of monotonic instants.
pub trait TimeSource: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Clock used by a [`TraceScope`].
#[derive(Clone, Default)]
pub enum Clock {
    /// [`Instant::now`].
    #[default]
    Monotonic,
    /// A caller-provided time source.
    Custom(Arc<dyn TimeSource>),
}

impl Clock {
    /// Current instant according to this clock.
    #[must_use]
    pub fn now(&self) -> Instant {
        match self {
            Self::Monotonic => Instant::now(),
            Self::Custom(source) => source.now(),
        }
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monotonic => f.write_str("Monotonic"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// The caller's active trace scope.
#[derive(Debug, Clone)]
pub struct TraceScope {
    span: Span,
    clock: Clock,
}

impl TraceScope {
    /// Scope bound to `span`, timed with the monotonic clock.
    #[must_use]
    pub fn new(span: Span) -> Self {
        Self { span, clock: Clock::Monotonic }
    }

    /// Scope bound to `span`, timed with `clock`.
    #[must_use]
    pub fn with_clock(span: Span, clock: Clock) -> Self {
        Self { span, clock }
    }

    /// Scope bound to the span the calling thread is currently inside.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Span::current())
    }

    /// The underlying span.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// The clock timing this scope.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Starts an unnamed sub-timer. Its measurement is not reported until it
    /// is given a name with [`ScopeTime::reset_named`].
    #[must_use]
    pub fn create_scope_time(&self) -> ScopeTime {
        ScopeTime { scope: self.clone(), label: None, started: self.clock.now() }
    }

    /// Starts a sub-timer named `label`.
    #[must_use]
    pub fn create_named_scope_time(&self, label: &'static str) -> ScopeTime {
        ScopeTime { scope: self.clone(), label: Some(label), started: self.clock.now() }
    }
}

/// Timer for one sub-operation of a [`TraceScope`].
#[derive(Debug)]
pub struct ScopeTime {
    scope: TraceScope,
    label: Option<&'static str>,
    started: Instant,
}

impl ScopeTime {
    /// Time elapsed since the current measurement started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.scope.clock.now().saturating_duration_since(self.started)
    }

    /// Name of the running measurement, if any.
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }

    /// Completes the running measurement and returns its duration.
    ///
    /// The timer keeps running unnamed afterwards.
    pub fn reset(&mut self) -> Duration {
        let now = self.scope.clock.now();
        let elapsed = now.saturating_duration_since(self.started);
        if let Some(label) = self.label.take() {
            report(&self.scope.span, label, elapsed);
        }
        self.started = now;
        elapsed
    }

    /// Completes the running measurement and starts a new one named `label`.
    pub fn reset_named(&mut self, label: &'static str) -> Duration {
        let elapsed = self.reset();
        self.label = Some(label);
        elapsed
    }

    /// Drops the running measurement without reporting it.
    pub fn discard(&mut self) {
        self.label = None;
        self.started = self.scope.clock.now();
    }
}

fn report(span: &Span, label: &'static str, elapsed: Duration) {
    tracing::trace!(
        target: "dbclient_stats::scope",
        parent: span,
        scope = label,
        elapsed_ms = duration_to_ms(elapsed),
        "scope time"
    );
}
