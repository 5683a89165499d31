/*!
 * Metric Names
 * Validated `component.subject[.unit]` namespaced names
 */

use crate::core::errors::MetricError;
use crate::core::types::{MetricKind, MetricResult, SmallStr};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit suffixes reserved for counters
const COUNTER_SUFFIXES: &[&str] = &["_total"];

/// Unit suffixes that never appear on counters
const MEASURE_SUFFIXES: &[&str] = &["_seconds", "_bytes", "_ratio", "_millis"];

const MAX_NAME_LEN: usize = 200;

/// Validated metric name
///
/// Follows `component.subject[.unit]`: at least two dotted segments, each
/// starting with a lowercase letter and containing only `[a-z0-9_]`. Unit
/// suffixes must agree with the metric kind (`_total` is counter-only;
/// `_seconds`/`_bytes` never name a counter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricName(SmallStr);

impl MetricName {
    /// Validate `raw` against the naming convention for the given kind
    pub fn parse(raw: &str, kind: MetricKind) -> MetricResult<Self> {
        if raw.is_empty() {
            return Err(MetricError::InvalidName("empty name".into()));
        }
        if raw.len() > MAX_NAME_LEN {
            let prefix: String = raw.chars().take(32).collect();
            return Err(MetricError::InvalidName(prefix.into()));
        }

        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() < 2 {
            return Err(MetricError::InvalidName(raw.into()));
        }
        for segment in &segments {
            if !valid_segment(segment) {
                return Err(MetricError::InvalidName(raw.into()));
            }
        }

        let last = segments[segments.len() - 1];
        let has_counter_suffix = COUNTER_SUFFIXES
            .iter()
            .any(|s| last.ends_with(s) || last == &s[1..]);
        let has_measure_suffix = MEASURE_SUFFIXES
            .iter()
            .any(|s| last.ends_with(s) || last == &s[1..]);

        match kind {
            MetricKind::Counter if has_measure_suffix => {
                Err(MetricError::InvalidName(raw.into()))
            }
            MetricKind::Gauge | MetricKind::Histogram if has_counter_suffix => {
                Err(MetricError::InvalidName(raw.into()))
            }
            _ => Ok(Self(raw.into())),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub(crate) fn as_small(&self) -> &SmallStr {
        &self.0
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(MetricName::parse("http.requests_total", MetricKind::Counter).is_ok());
        assert!(MetricName::parse("http.request.duration_seconds", MetricKind::Histogram).is_ok());
        assert!(MetricName::parse("queue.depth", MetricKind::Gauge).is_ok());
        assert!(MetricName::parse("cache.size_bytes", MetricKind::Gauge).is_ok());
    }

    #[test]
    fn test_malformed_names() {
        for raw in ["", "http", "http..requests", "Http.requests", "http.req-uests", "1http.requests", "http.requests "] {
            assert!(
                MetricName::parse(raw, MetricKind::Gauge).is_err(),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_unit_suffix_kind_consistency() {
        // _total is counter-only
        assert!(MetricName::parse("http.requests_total", MetricKind::Gauge).is_err());
        assert!(MetricName::parse("http.requests_total", MetricKind::Histogram).is_err());
        // measures never name a counter
        assert!(MetricName::parse("http.duration_seconds", MetricKind::Counter).is_err());
        assert!(MetricName::parse("cache.size_bytes", MetricKind::Counter).is_err());
    }

    #[test]
    fn test_overlong_name_rejected() {
        let raw = format!("component.{}", "x".repeat(MAX_NAME_LEN));
        assert!(MetricName::parse(&raw, MetricKind::Gauge).is_err());
    }
}
