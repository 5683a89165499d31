/*!
 * Bucketed Histogram
 * Fixed-memory quantile estimation over unbounded observation streams
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Default bucket ladder, seconds-oriented
pub const DEFAULT_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0];

/// Add a delta onto an f64 stored as atomic bits
///
/// CAS loop; relaxed ordering is enough since readers only need some
/// serialized value, not acquire/release pairing.
#[inline]
pub(crate) fn atomic_f64_add(cell: &AtomicU64, delta: f64) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = (f64::from_bits(current) + delta).to_bits();
        match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

#[inline]
pub(crate) fn atomic_f64_load(cell: &AtomicU64) -> f64 {
    f64::from_bits(cell.load(Ordering::Relaxed))
}

#[inline]
pub(crate) fn atomic_f64_store(cell: &AtomicU64, value: f64) {
    cell.store(value.to_bits(), Ordering::Relaxed)
}

/// Concurrent bucketed histogram
///
/// Each observation lands in exactly one bucket: the first boundary ≥ value,
/// or the overflow slot past the last boundary. Bucket increments and
/// count/sum updates are individually atomic, so no observation is lost or
/// double-counted under concurrent writers; a snapshot read racing a write
/// may see the count before the sum, which is acceptable for estimates.
///
/// `count` and `sum` accumulate exactly, independent of bucketing, so the
/// mean is always exact even though percentiles are approximate.
#[derive(Debug)]
pub struct BucketHistogram {
    // Sorted ascending, deduplicated, finite
    bounds: Box<[f64]>,
    // bounds.len() + 1 slots; last is the overflow bucket
    counts: Box<[AtomicU64]>,
    count: AtomicU64,
    sum: AtomicU64,
}

impl BucketHistogram {
    /// Build with explicit boundaries; non-finite entries are discarded and
    /// the rest sorted and deduplicated. An empty list falls back to
    /// [`DEFAULT_BUCKETS`].
    pub fn new(boundaries: &[f64]) -> Self {
        let mut bounds: Vec<f64> = boundaries.iter().copied().filter(|b| b.is_finite()).collect();
        if bounds.is_empty() {
            bounds.extend_from_slice(&DEFAULT_BUCKETS);
        }
        bounds.sort_by(f64::total_cmp);
        bounds.dedup();

        let counts = (0..bounds.len() + 1).map(|_| AtomicU64::new(0)).collect();
        Self {
            bounds: bounds.into_boxed_slice(),
            counts,
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
        }
    }

    /// Fold one observation into the estimator
    #[inline]
    pub fn observe(&self, value: f64) {
        let idx = self.bounds.partition_point(|b| *b < value);
        self.counts[idx].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        atomic_f64_add(&self.sum, value);
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        atomic_f64_load(&self.sum)
    }

    /// Estimate the quantile `p` in [0, 1]
    ///
    /// Interpolates linearly within the bucket containing the requested
    /// rank, using cumulative bucket counts. The error is bounded by one
    /// bucket width; values in the overflow bucket clamp to the last
    /// boundary.
    pub fn quantile(&self, p: f64) -> f64 {
        let total = self.count();
        if total == 0 {
            return 0.0;
        }
        let p = p.clamp(0.0, 1.0);
        let rank = p * total as f64;

        let mut cumulative = 0u64;
        for (i, slot) in self.counts.iter().enumerate() {
            let in_bucket = slot.load(Ordering::Relaxed);
            if in_bucket == 0 {
                continue;
            }
            let next_cumulative = cumulative + in_bucket;
            if (next_cumulative as f64) >= rank {
                let lower = if i == 0 { 0.0 } else { self.bounds[i - 1] };
                let upper = self.bounds[i.min(self.bounds.len() - 1)];
                let fraction = (rank - cumulative as f64) / in_bucket as f64;
                return lower + (upper - lower) * fraction.clamp(0.0, 1.0);
            }
            cumulative = next_cumulative;
        }

        // Rank beyond all recorded counts (racing writer); clamp to the top
        self.bounds[self.bounds.len() - 1]
    }

    /// Per-bucket (upper_bound, count) pairs plus the overflow count
    pub fn buckets(&self) -> (Vec<(f64, u64)>, u64) {
        let pairs = self
            .bounds
            .iter()
            .enumerate()
            .map(|(i, &b)| (b, self.counts[i].load(Ordering::Relaxed)))
            .collect();
        let overflow = self.counts[self.bounds.len()].load(Ordering::Relaxed);
        (pairs, overflow)
    }

    /// Aggregate view for snapshots
    pub fn summary(&self) -> HistogramSummary {
        let count = self.count();
        let sum = self.sum();
        HistogramSummary {
            count,
            sum,
            avg: if count > 0 { sum / count as f64 } else { 0.0 },
            p50: self.quantile(0.50),
            p95: self.quantile(0.95),
            p99: self.quantile(0.99),
        }
    }
}

/// Histogram statistics at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}
