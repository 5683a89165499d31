/*!
 * SDK Configuration
 * Process-wide options fixed at initialization
 */

use crate::core::types::Level;
use crate::metrics::histogram::DEFAULT_BUCKETS;
use crate::metrics::label::LabelSet;
use crate::redact::{RedactionRule, Redactor};
use std::time::Duration;

/// Default ceiling on distinct label sets per metric name
pub const DEFAULT_CARDINALITY_CEILING: usize = 2000;

/// Default number of identical emissions that pass before suppression
pub const DEFAULT_LOOP_GUARD_THRESHOLD: u32 = 3;

/// Default loop guard window
pub const DEFAULT_LOOP_GUARD_WINDOW: Duration = Duration::from_secs(10);

/// SDK configuration, consumed once by [`crate::init`]
///
/// Builder-style `with_*` methods; every field has a documented default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Records below this level are no-ops
    pub min_level: Level,
    /// Max distinct label sets per metric name before overflow coalescing
    pub cardinality_ceiling: usize,
    /// Identical emissions admitted per window before suppression
    pub loop_guard_threshold: u32,
    /// Loop guard window length
    pub loop_guard_window: Duration,
    /// Histogram bucket boundaries; empty falls back to the default ladder
    pub histogram_buckets: Vec<f64>,
    /// Ordered redaction rules, consulted by both log and label paths
    pub redaction_rules: Vec<RedactionRule>,
    /// Process identity fields stamped onto every record (ambient wins over
    /// caller fields of the same name)
    pub ambient_fields: LabelSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_level: Level::Info,
            cardinality_ceiling: DEFAULT_CARDINALITY_CEILING,
            loop_guard_threshold: DEFAULT_LOOP_GUARD_THRESHOLD,
            loop_guard_window: DEFAULT_LOOP_GUARD_WINDOW,
            histogram_buckets: DEFAULT_BUCKETS.to_vec(),
            redaction_rules: Redactor::default_rules(),
            ambient_fields: LabelSet::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_cardinality_ceiling(mut self, ceiling: usize) -> Self {
        self.cardinality_ceiling = ceiling.max(1);
        self
    }

    pub fn with_loop_guard(mut self, threshold: u32, window: Duration) -> Self {
        self.loop_guard_threshold = threshold;
        self.loop_guard_window = window;
        self
    }

    pub fn with_histogram_buckets(mut self, boundaries: Vec<f64>) -> Self {
        self.histogram_buckets = boundaries;
        self
    }

    /// Append a rule; priority among equally specific rules follows
    /// insertion order
    pub fn with_redaction_rule(mut self, rule: RedactionRule) -> Self {
        self.redaction_rules.push(rule);
        self
    }

    /// Replace the default rule set entirely
    pub fn with_redaction_rules(mut self, rules: Vec<RedactionRule>) -> Self {
        self.redaction_rules = rules;
        self
    }

    pub fn with_ambient_field(mut self, key: &str, value: &str) -> Self {
        self.ambient_fields = self.ambient_fields.with(key, value);
        self
    }
}
