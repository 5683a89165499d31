/*!
 * Metrics
 * Series registry, aggregators, and quantile estimation
 */

pub mod histogram;
pub mod label;
pub mod name;
pub mod registry;
pub mod series;

pub use histogram::{BucketHistogram, HistogramSummary, DEFAULT_BUCKETS};
pub use label::{LabelSet, LabelSetBuilder};
pub use name::MetricName;
pub use registry::{
    RegistryDiagnostics, RegistrySnapshot, SeriesHandle, SeriesRegistry, Timer,
};
pub use series::{AggregatedValue, Series, SeriesSnapshot};
