/*!
 * Core Module
 * Fundamental SDK types, configuration, and error handling
 */

pub mod config;
pub mod errors;
pub mod types;

// Re-export for convenience
pub use config::Config;
pub use errors::{MetricError, SinkError};
pub use types::{Level, MetricKind, MetricResult, SmallStr};
