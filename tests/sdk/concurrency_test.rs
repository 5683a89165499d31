/*!
 * Concurrency Tests
 * No lost updates under unbounded concurrent callers
 */

use obskit::{AggregatedValue, MetricKind, SeriesRegistry};
use std::sync::Arc;
use std::thread;

const WRITERS: usize = 8;
const INCREMENTS: usize = 2_000;

#[test]
fn test_concurrent_counter_no_lost_updates() {
    let registry = Arc::new(SeriesRegistry::with_defaults());
    let handle = registry
        .register("stress.events_total", MetricKind::Counter, &["worker"])
        .unwrap();

    let mut joins = Vec::new();
    for _ in 0..WRITERS {
        let registry = Arc::clone(&registry);
        let handle = handle.clone();
        joins.push(thread::spawn(move || {
            for _ in 0..INCREMENTS {
                registry.increment(&handle, &["shared"]);
            }
        }));
    }
    for join in joins {
        join.join().unwrap();
    }

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.series.len(), 1);
    assert_eq!(
        snapshot.series[0].value,
        AggregatedValue::Counter {
            total: (WRITERS * INCREMENTS) as f64
        }
    );
}

#[test]
fn test_concurrent_histogram_count_exact() {
    let registry = Arc::new(SeriesRegistry::with_defaults());
    let handle = registry
        .register("stress.duration_seconds", MetricKind::Histogram, &[])
        .unwrap();

    let mut joins = Vec::new();
    for w in 0..WRITERS {
        let registry = Arc::clone(&registry);
        let handle = handle.clone();
        joins.push(thread::spawn(move || {
            for i in 0..INCREMENTS {
                registry.observe(&handle, &[], ((w + i) % 10) as f64 / 10.0);
            }
        }));
    }
    for join in joins {
        join.join().unwrap();
    }

    match &registry.snapshot().series[0].value {
        AggregatedValue::Histogram(summary) => {
            assert_eq!(summary.count, (WRITERS * INCREMENTS) as u64);
        }
        other => panic!("expected histogram, got {other:?}"),
    }
}

#[test]
fn test_concurrent_lazy_creation_single_series() {
    // All writers race to create the same (name, labels) series; exactly one
    // aggregator must win and absorb every observation
    let registry = Arc::new(SeriesRegistry::with_defaults());
    let handle = registry
        .register("race.created_total", MetricKind::Counter, &["key"])
        .unwrap();

    let mut joins = Vec::new();
    for _ in 0..WRITERS {
        let registry = Arc::clone(&registry);
        let handle = handle.clone();
        joins.push(thread::spawn(move || {
            registry.increment(&handle, &["same"]);
        }));
    }
    for join in joins {
        join.join().unwrap();
    }

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.series.len(), 1);
    assert_eq!(
        snapshot.series[0].value,
        AggregatedValue::Counter {
            total: WRITERS as f64
        }
    );
}

#[test]
fn test_snapshot_concurrent_with_writers() {
    // Snapshots taken mid-stress must observe internally consistent series
    // and never panic or block writers into losing updates
    let registry = Arc::new(SeriesRegistry::with_defaults());
    let handle = registry
        .register("stress.mixed_total", MetricKind::Counter, &["worker"])
        .unwrap();

    let mut joins = Vec::new();
    for w in 0..WRITERS {
        let registry = Arc::clone(&registry);
        let handle = handle.clone();
        joins.push(thread::spawn(move || {
            let worker = w.to_string();
            for _ in 0..INCREMENTS {
                registry.increment(&handle, &[worker.as_str()]);
            }
        }));
    }
    for _ in 0..50 {
        let snapshot = registry.snapshot();
        for series in &snapshot.series {
            if let AggregatedValue::Counter { total } = series.value {
                assert!(total >= 0.0 && total <= INCREMENTS as f64);
            }
        }
    }
    for join in joins {
        join.join().unwrap();
    }

    let total: f64 = registry
        .snapshot()
        .series
        .iter()
        .map(|s| match s.value {
            AggregatedValue::Counter { total } => total,
            _ => 0.0,
        })
        .sum();
    assert_eq!(total, (WRITERS * INCREMENTS) as f64);
}
