/*!
 * End-to-End Pipeline Tests
 * Registry + emitter + sinks wired the way a service embeds them
 */

use obskit::logging::{BufferSink, CaptureSink};
use obskit::{Config, LabelSet, Level, MetricKind, Sdk};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_service_style_usage() {
    let sink = Arc::new(CaptureSink::new());
    let sdk = Sdk::new(
        Config::default()
            .with_min_level(Level::Debug)
            .with_ambient_field("service", "checkout")
            .with_ambient_field("instance", "i-42"),
        sink.clone(),
    );

    let requests = sdk
        .registry()
        .register("http.requests_total", MetricKind::Counter, &["route", "status"])
        .unwrap();
    let latency = sdk
        .registry()
        .register("http.request.duration_seconds", MetricKind::Histogram, &["route"])
        .unwrap();

    for status in ["200", "200", "500"] {
        let timer = sdk.registry().start_timer(&latency, &["/pay"]);
        sdk.registry().increment(&requests, &["/pay", status]);
        timer.stop();
    }

    sdk.emitter().info("request handled", || {
        [("route", "/pay"), ("card_number", "4111111111111111")]
            .as_slice()
            .into()
    });

    let snapshot = sdk.snapshot();
    assert_eq!(snapshot.series.len(), 3); // 2 counter series + 1 histogram

    let record = &sink.records()[0];
    assert_eq!(record.fields.get("service"), Some("checkout"));
    assert_eq!(record.fields.get("card_number"), Some(obskit::MASK_TOKEN));

    // Snapshot serializes cleanly for an external exporter
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("http.requests_total"));
    assert!(json.contains("uptime_secs"));
}

#[test]
fn test_exporter_buffer_isolates_hot_path() {
    let buffer = Arc::new(BufferSink::new(4));
    let sdk = Sdk::new(Config::default(), buffer.clone());

    for i in 0..10 {
        let message = format!("event {i}");
        sdk.emitter().info(&message, LabelSet::new);
    }

    // Hot path never blocked: oldest records were dropped, newest retained
    assert_eq!(buffer.dropped(), 6);
    let drained = buffer.drain();
    assert_eq!(drained.len(), 4);
    assert_eq!(drained.last().unwrap().message.as_str(), "event 9");
    assert_eq!(sdk.emitter().stats().write_failures, 0);
}

#[test]
fn test_burst_summary_in_pipeline() {
    let sink = Arc::new(CaptureSink::new());
    let sdk = Sdk::new(
        Config::default().with_loop_guard(3, Duration::from_secs(60)),
        sink.clone(),
    );

    for _ in 0..50 {
        sdk.emitter().warn("retry storm", LabelSet::new);
    }
    sdk.emitter().flush();

    let records = sink.records();
    // threshold emissions + one coalesced summary, at the burst's level
    assert_eq!(records.len(), 4);
    assert_eq!(records[3].level, Level::Warn);
    assert_eq!(records[3].fields.get("suppressed"), Some("47"));
}

#[test]
#[serial]
fn test_global_init_returns_same_instance() {
    let sink = Arc::new(CaptureSink::new());
    let first = obskit::init(Config::default(), sink);
    let again = obskit::init(Config::default(), Arc::new(CaptureSink::new()));

    assert!(std::ptr::eq(first, again));
    assert!(obskit::try_get().is_some());
}
