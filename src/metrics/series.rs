/*!
 * Series & Aggregators
 * Per-series mutable state: counter, gauge, histogram
 */

use crate::core::errors::MetricError;
use crate::core::types::MetricKind;
use crate::metrics::histogram::{
    atomic_f64_add, atomic_f64_load, atomic_f64_store, BucketHistogram, HistogramSummary,
};
use crate::metrics::label::LabelSet;
use crate::metrics::name::MetricName;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicU64;

/// Aggregation state, one variant per metric kind
#[derive(Debug)]
enum Aggregator {
    /// Monotonic accumulated value (f64 bits)
    Counter(AtomicU64),
    /// Last-written value (f64 bits), last-write-wins under concurrency
    Gauge(AtomicU64),
    Histogram(BucketHistogram),
}

/// A single (metric name, label set) series and its aggregator
///
/// Created lazily on first observation, owned by the registry for the
/// process lifetime.
#[derive(Debug)]
pub struct Series {
    name: MetricName,
    labels: LabelSet,
    agg: Aggregator,
}

impl Series {
    pub(crate) fn new(name: MetricName, labels: LabelSet, kind: MetricKind, buckets: &[f64]) -> Self {
        let agg = match kind {
            MetricKind::Counter => Aggregator::Counter(AtomicU64::new(0f64.to_bits())),
            MetricKind::Gauge => Aggregator::Gauge(AtomicU64::new(0f64.to_bits())),
            MetricKind::Histogram => Aggregator::Histogram(BucketHistogram::new(buckets)),
        };
        Self { name, labels, agg }
    }

    #[inline]
    pub fn kind(&self) -> MetricKind {
        match self.agg {
            Aggregator::Counter(_) => MetricKind::Counter,
            Aggregator::Gauge(_) => MetricKind::Gauge,
            Aggregator::Histogram(_) => MetricKind::Histogram,
        }
    }

    #[inline]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Fold one observation into the aggregator
    ///
    /// Counters reject negative or non-finite deltas; gauges accept any
    /// finite value (overwrite semantics); histograms fold every finite
    /// value into the estimator.
    pub(crate) fn apply(&self, value: f64) -> Result<(), MetricError> {
        if !value.is_finite() {
            return Err(self.invalid("non-finite value"));
        }
        match &self.agg {
            Aggregator::Counter(cell) => {
                if value < 0.0 {
                    return Err(self.invalid("negative counter delta"));
                }
                atomic_f64_add(cell, value);
            }
            Aggregator::Gauge(cell) => atomic_f64_store(cell, value),
            Aggregator::Histogram(hist) => hist.observe(value),
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> MetricError {
        MetricError::InvalidObservation {
            name: self.name.as_small().clone(),
            reason: reason.into(),
        }
    }

    /// Point-in-time aggregated value
    pub fn value(&self) -> AggregatedValue {
        match &self.agg {
            Aggregator::Counter(cell) => AggregatedValue::Counter {
                total: atomic_f64_load(cell),
            },
            Aggregator::Gauge(cell) => AggregatedValue::Gauge {
                value: atomic_f64_load(cell),
            },
            Aggregator::Histogram(hist) => AggregatedValue::Histogram(hist.summary()),
        }
    }

    pub(crate) fn snapshot(&self) -> SeriesSnapshot {
        SeriesSnapshot {
            name: self.name.clone(),
            kind: self.kind(),
            labels: self.labels.clone(),
            value: self.value(),
        }
    }
}

/// Aggregated value of one series
///
/// Untagged: the enclosing [`SeriesSnapshot`] already carries the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregatedValue {
    Counter { total: f64 },
    Gauge { value: f64 },
    Histogram(HistogramSummary),
}

/// One series in a registry snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub name: MetricName,
    pub kind: MetricKind,
    pub labels: LabelSet,
    pub value: AggregatedValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(kind: MetricKind) -> Series {
        let raw = match kind {
            MetricKind::Counter => "test.events_total",
            _ => "test.value",
        };
        let name = MetricName::parse(raw, kind).unwrap();
        Series::new(name, LabelSet::new(), kind, &[0.1, 1.0])
    }

    #[test]
    fn test_counter_accumulates() {
        let s = series(MetricKind::Counter);
        s.apply(1.0).unwrap();
        s.apply(2.5).unwrap();
        assert_eq!(s.value(), AggregatedValue::Counter { total: 3.5 });
    }

    #[test]
    fn test_counter_rejects_negative_delta() {
        let s = series(MetricKind::Counter);
        s.apply(5.0).unwrap();
        let err = s.apply(-1.0).unwrap_err();
        assert!(matches!(err, MetricError::InvalidObservation { .. }));
        // Accumulated value unchanged
        assert_eq!(s.value(), AggregatedValue::Counter { total: 5.0 });
    }

    #[test]
    fn test_gauge_last_write_wins() {
        let s = series(MetricKind::Gauge);
        s.apply(10.0).unwrap();
        s.apply(-3.0).unwrap(); // gauges accept any finite value
        assert_eq!(s.value(), AggregatedValue::Gauge { value: -3.0 });
    }

    #[test]
    fn test_non_finite_rejected() {
        let s = series(MetricKind::Gauge);
        assert!(s.apply(f64::NAN).is_err());
        assert!(s.apply(f64::INFINITY).is_err());
    }

    #[test]
    fn test_histogram_folds() {
        let s = series(MetricKind::Histogram);
        s.apply(0.05).unwrap();
        s.apply(0.5).unwrap();
        match s.value() {
            AggregatedValue::Histogram(summary) => {
                assert_eq!(summary.count, 2);
                assert!((summary.sum - 0.55).abs() < 1e-9);
            }
            other => panic!("expected histogram, got {other:?}"),
        }
    }
}
