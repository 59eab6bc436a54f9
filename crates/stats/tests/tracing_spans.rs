//! Integration tests verifying the diagnostics emitted through `tracing`:
//! scope-time events parented to the caller's span, aggregator log lines and
//! forwarded driver messages.

#![allow(clippy::expect_used)]

use std::{
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use dbclient_stats::{
    Aggregator, DriverErrorKind, OperationStopwatch, PoolConnectStatistics, PoolQueueStopwatch,
    PoolRequestStopwatch, ReadOpType, ReadOperationStatistics, log_driver_message,
    testutil::manual_scope_in,
};
use tracing::{Level, Subscriber, field::Field};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer: records every event with its level, parent and fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CapturedEvent {
    target: String,
    level: Level,
    parent: Option<String>,
    fields: Vec<(String, String)>,
}

impl CapturedEvent {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

struct FieldVisitor<'a>(&'a mut Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.push((field.name().to_owned(), value.to_owned()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.push((field.name().to_owned(), format!("{value:?}")));
    }
}

#[derive(Clone, Default)]
struct EventCollector {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCollector {
    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }

    fn scope_events(&self) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| e.target == "dbclient_stats::scope").collect()
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut fields = Vec::new();
        event.record(&mut FieldVisitor(&mut fields));
        let parent = ctx.event_span(event).map(|span| span.name().to_owned());
        self.events.lock().expect("lock poisoned").push(CapturedEvent {
            target: event.metadata().target().to_owned(),
            level: *event.metadata().level(),
            parent,
            fields,
        });
    }
}

fn install() -> (EventCollector, tracing::subscriber::DefaultGuard) {
    let collector = EventCollector::default();
    let subscriber = tracing_subscriber::registry().with(collector.clone());
    (collector, tracing::subscriber::set_default(subscriber))
}

// ---------------------------------------------------------------------------
// Scope time events
// ---------------------------------------------------------------------------

#[test]
fn accounted_operation_emits_scope_event_on_callers_span() {
    let (collector, _guard) = install();
    let agg: Arc<Aggregator<ReadOperationStatistics>> = Arc::new(Aggregator::new());

    let span = tracing::info_span!("query");
    let (scope, clock) = manual_scope_in(span);
    let mut stopwatch = OperationStopwatch::start(&scope, &agg, ReadOpType::Find);
    clock.advance(Duration::from_millis(17));
    stopwatch.account_success();

    let events = collector.scope_events();
    assert_eq!(events.len(), 1, "expected one scope event, got: {events:?}");
    let event = &events[0];
    assert_eq!(event.level, Level::TRACE);
    assert_eq!(event.parent.as_deref(), Some("query"));
    assert_eq!(event.field("scope"), Some("find"));
    assert_eq!(event.field("elapsed_ms"), Some("17"));
}

#[test]
fn discarded_operation_emits_no_scope_event() {
    let (collector, _guard) = install();
    let agg: Arc<Aggregator<ReadOperationStatistics>> = Arc::new(Aggregator::new());

    let (scope, _clock) = manual_scope_in(tracing::info_span!("query"));
    let mut stopwatch = OperationStopwatch::start(&scope, &agg, ReadOpType::GetMore);
    stopwatch.discard();
    drop(stopwatch);

    let events = collector.scope_events();
    assert!(events.is_empty(), "expected no scope events, got: {events:?}");
}

#[test]
fn pool_stopwatches_use_connection_labels() {
    let (collector, _guard) = install();
    let agg: Arc<Aggregator<PoolConnectStatistics>> = Arc::new(Aggregator::new());

    let (scope, _clock) = manual_scope_in(tracing::info_span!("checkout"));
    let mut queue = PoolQueueStopwatch::new(&scope, &agg);
    queue.stop();
    drop(PoolRequestStopwatch::new(&scope, &agg));

    let labels: Vec<_> = collector
        .scope_events()
        .iter()
        .filter_map(|e| e.field("scope").map(str::to_owned))
        .collect();
    assert_eq!(labels, ["conn-throttle", "conn-wait"]);
}

#[test]
fn reset_reports_prior_operation_label() {
    let (collector, _guard) = install();
    let agg: Arc<Aggregator<ReadOperationStatistics>> = Arc::new(Aggregator::new());

    let (scope, _clock) = manual_scope_in(tracing::info_span!("cursor"));
    let mut stopwatch = OperationStopwatch::start(&scope, &agg, ReadOpType::Find);
    stopwatch.reset(&agg, ReadOpType::GetMore);
    stopwatch.account_error(DriverErrorKind::Network);

    let labels: Vec<_> = collector
        .scope_events()
        .iter()
        .filter_map(|e| e.field("scope").map(str::to_owned))
        .collect();
    assert_eq!(labels, ["find", "getmore"]);
}

// ---------------------------------------------------------------------------
// Aggregator logs
// ---------------------------------------------------------------------------

#[test]
fn log_statistics_warns_on_high_error_rate() {
    let (collector, _guard) = install();
    let agg: Aggregator<ReadOperationStatistics> = Aggregator::new();
    agg.current()[ReadOpType::Count].record_outcome(dbclient_stats::ErrorType::Network);
    agg.current()[ReadOpType::Find].record_outcome(dbclient_stats::ErrorType::Success);

    agg.log_statistics();

    let events = collector.events();
    let info: Vec<_> = events.iter().filter(|e| e.level == Level::INFO).collect();
    assert_eq!(info.len(), 2, "one info line per active operation, got: {events:?}");

    let warnings: Vec<_> = events.iter().filter(|e| e.level == Level::WARN).collect();
    assert_eq!(warnings.len(), 1, "got: {events:?}");
    assert_eq!(warnings[0].field("operation"), Some("count"));
}

#[test]
fn rotate_logs_generation_at_debug() {
    let (collector, _guard) = install();
    let agg: Aggregator<PoolConnectStatistics> = Aggregator::new();
    agg.rotate();
    agg.rotate();

    let generations: Vec<_> = collector
        .events()
        .iter()
        .filter(|e| e.level == Level::DEBUG && e.field("table") == Some("pool"))
        .filter_map(|e| e.field("generation").map(str::to_owned))
        .collect();
    assert_eq!(generations, ["1", "2"]);
}

// ---------------------------------------------------------------------------
// Driver log forwarding
// ---------------------------------------------------------------------------

#[test]
fn driver_messages_map_to_tracing_levels() {
    let (collector, _guard) = install();

    log_driver_message(1, "cluster", "server selection failed");
    log_driver_message(4, "client", "connected");
    log_driver_message(6, "stream", "read 42 bytes");

    let levels: Vec<_> = collector.events().iter().map(|e| e.level).collect();
    assert_eq!(levels, [Level::WARN, Level::DEBUG, Level::TRACE]);

    let events = collector.events();
    assert_eq!(
        events[0].field("message"),
        Some("Mongo driver critical [cluster]: server selection failed")
    );
}

#[test]
fn unknown_driver_level_warns_twice() {
    let (collector, _guard) = install();

    log_driver_message(99, "client", "odd message");

    let events = collector.events();
    assert_eq!(events.len(), 2, "got: {events:?}");
    assert!(events.iter().all(|e| e.level == Level::WARN));
    assert_eq!(events[0].field("raw_level"), Some("99"));
    assert_eq!(events[1].field("message"), Some("Mongo driver unknown [client]: odd message"));
}
