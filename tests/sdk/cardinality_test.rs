/*!
 * Cardinality Guard Tests
 */

use obskit::{AggregatedValue, Config, MetricError, MetricKind, Redactor, SeriesRegistry};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn registry_with_ceiling(ceiling: usize) -> SeriesRegistry {
    let config = Config::default().with_cardinality_ceiling(ceiling);
    let redactor = Arc::new(Redactor::new(config.redaction_rules.clone()));
    SeriesRegistry::new(&config, redactor)
}

#[test]
fn test_up_to_ceiling_succeeds_then_coalesces() {
    let ceiling = 10;
    let registry = registry_with_ceiling(ceiling);
    let handle = registry
        .register("api.calls_total", MetricKind::Counter, &["endpoint"])
        .unwrap();

    for i in 0..ceiling {
        let endpoint = format!("/endpoint/{i}");
        registry.increment(&handle, &[endpoint.as_str()]);
    }
    assert_eq!(registry.cardinality(&handle), ceiling);
    assert_eq!(registry.diagnostics().cardinality_rejections, 0);

    // One past the ceiling: rejected and coalesced
    registry.increment(&handle, &["/endpoint/overflowing"]);
    assert_eq!(registry.diagnostics().cardinality_rejections, 1);
    assert_eq!(registry.cardinality(&handle), ceiling);

    // Previously-registered series keep accepting observations
    registry.increment(&handle, &["/endpoint/0"]);
    let snapshot = registry.snapshot();
    let first = snapshot
        .series
        .iter()
        .find(|s| s.labels.get("endpoint") == Some("/endpoint/0"))
        .unwrap();
    assert_eq!(first.value, AggregatedValue::Counter { total: 2.0 });
}

#[test]
fn test_ceiling_is_per_metric_name() {
    let registry = registry_with_ceiling(2);
    let a = registry
        .register("a.series_total", MetricKind::Counter, &["k"])
        .unwrap();
    let b = registry
        .register("b.series_total", MetricKind::Counter, &["k"])
        .unwrap();

    registry.increment(&a, &["1"]);
    registry.increment(&a, &["2"]);
    registry.increment(&a, &["3"]); // a overflows

    registry.increment(&b, &["1"]);
    registry.increment(&b, &["2"]); // b still under its own ceiling

    assert_eq!(registry.cardinality(&a), 2);
    assert_eq!(registry.cardinality(&b), 2);
    assert_eq!(registry.diagnostics().cardinality_rejections, 1);
}

#[test]
fn test_registration_fails_fast() {
    let registry = SeriesRegistry::with_defaults();

    assert!(matches!(
        registry.register("", MetricKind::Counter, &[]),
        Err(MetricError::InvalidName(_))
    ));
    assert!(matches!(
        registry.register("UPPER.case", MetricKind::Gauge, &[]),
        Err(MetricError::InvalidName(_))
    ));

    registry
        .register("http.in_flight", MetricKind::Gauge, &[])
        .unwrap();
    assert!(matches!(
        registry.register("http.in_flight", MetricKind::Counter, &[]),
        Err(MetricError::KindConflict { .. })
    ));
}

#[test]
fn test_reregistration_same_kind_shares_state() {
    let registry = SeriesRegistry::with_defaults();
    let first = registry
        .register("cache.hits_total", MetricKind::Counter, &["tier"])
        .unwrap();
    let second = registry
        .register("cache.hits_total", MetricKind::Counter, &["tier"])
        .unwrap();

    registry.increment(&first, &["l1"]);
    registry.increment(&second, &["l1"]);

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.series.len(), 1);
    assert_eq!(
        snapshot.series[0].value,
        AggregatedValue::Counter { total: 2.0 }
    );
}
