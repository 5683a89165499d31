/*!
 * Quantile Estimation Tests
 * Error bounds against known synthetic distributions
 */

use obskit::metrics::BucketHistogram;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_uniform_distribution_error_bound() {
    // Uniform over [0, 1000) into width-100 buckets: any quantile estimate
    // may be off by at most one bucket width
    let bounds: Vec<f64> = (1..=10).map(|i| (i * 100) as f64).collect();
    let hist = BucketHistogram::new(&bounds);

    let mut rng = StdRng::seed_from_u64(42);
    let mut values: Vec<f64> = (0..10_000).map(|_| rng.gen_range(0.0..1000.0)).collect();
    for &v in &values {
        hist.observe(v);
    }

    values.sort_by(f64::total_cmp);
    let true_p50 = values[values.len() / 2];
    let true_p99 = values[values.len() * 99 / 100];

    assert!((hist.quantile(0.50) - true_p50).abs() <= 100.0);
    assert!((hist.quantile(0.99) - true_p99).abs() <= 100.0);

    assert_eq!(hist.count(), 10_000);
    let true_sum: f64 = values.iter().sum();
    assert!((hist.sum() - true_sum).abs() < 1e-6 * true_sum);
}

#[test]
fn test_skewed_distribution_error_bound() {
    // Heavy tail: 95% fast requests, 5% slow ones
    let bounds = [0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];
    let hist = BucketHistogram::new(&bounds);

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..9_500 {
        hist.observe(rng.gen_range(0.001..0.01));
    }
    for _ in 0..500 {
        hist.observe(rng.gen_range(0.5..1.0));
    }

    // p50 must land in the fast region, p99 in the slow region
    assert!(hist.quantile(0.50) <= 0.01);
    assert!(hist.quantile(0.99) >= 0.5);
    assert!(hist.quantile(0.99) <= 1.0);
}

#[test]
fn test_mean_exact_despite_approximate_percentiles() {
    let hist = BucketHistogram::new(&[1.0, 2.0]);
    for v in [0.5, 1.5, 2.5, 3.5] {
        hist.observe(v);
    }
    assert_eq!(hist.count(), 4);
    assert!((hist.sum() - 8.0).abs() < 1e-9);
    // Exact mean from exact count/sum
    assert!((hist.sum() / hist.count() as f64 - 2.0).abs() < 1e-9);
}
