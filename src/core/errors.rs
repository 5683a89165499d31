/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::{MetricKind, SmallStr};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metric registration and observation errors with serialization support
///
/// Registration errors (`InvalidName`, `KindConflict`) surface synchronously
/// at `register` time. Observation errors (`InvalidObservation`,
/// `CardinalityExceeded`) never reach the hot-path caller: the registry
/// counts them and reports through the loop-guarded log path.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum MetricError {
    #[error("Invalid metric name: {0}")]
    #[diagnostic(
        code(metrics::invalid_name),
        help("Names follow component.subject[.unit]: lowercase letters, digits, '_' within dotted segments.")
    )]
    InvalidName(SmallStr),

    #[error("Metric {name} already registered as {existing}, requested {requested}")]
    #[diagnostic(
        code(metrics::kind_conflict),
        help("A metric name maps to exactly one kind for the process lifetime. Pick a distinct name.")
    )]
    KindConflict {
        name: SmallStr,
        existing: MetricKind,
        requested: MetricKind,
    },

    #[error("Invalid observation for {name}: {reason}")]
    #[diagnostic(
        code(metrics::invalid_observation),
        help("Counter deltas must be non-negative and finite.")
    )]
    InvalidObservation { name: SmallStr, reason: SmallStr },

    #[error("Cardinality ceiling reached for {name}: {ceiling} distinct label sets")]
    #[diagnostic(
        code(metrics::cardinality_exceeded),
        help("Reduce label dimensionality or raise cardinality_ceiling in the SDK config.")
    )]
    CardinalityExceeded { name: SmallStr, ceiling: usize },
}

/// Sink write errors
///
/// Fully internal: the emitter counts these and drops the record, it never
/// lets a broken sink break the calling business logic.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("sink closed")]
    Closed,
}
