/*!
 * obskit
 * Embedded observability SDK: metrics registry and structured log emitter
 *
 * Services embed the SDK and obtain handles from an explicitly initialized
 * process-wide instance: a [`SeriesRegistry`] aggregating counter, gauge and
 * histogram series per label set, and an [`Emitter`] producing redacted,
 * loop-guarded structured records. Export to a monitoring backend is an
 * external collaborator consuming [`SeriesRegistry::snapshot`] and a
 * [`Sink`].
 */

pub mod core;
pub mod logging;
pub mod metrics;
pub mod redact;

// Re-exports
pub use crate::core::config::Config;
pub use crate::core::errors::{MetricError, SinkError};
pub use crate::core::types::{Level, MetricKind, MetricResult};
pub use crate::logging::{Emitter, EmitterStats, LogRecord, Sink};
pub use crate::metrics::{
    AggregatedValue, LabelSet, MetricName, RegistrySnapshot, SeriesHandle, SeriesRegistry, Timer,
};
pub use crate::redact::{MaskAction, RedactionRule, Redactor, MASK_TOKEN};

use std::sync::{Arc, OnceLock};

/// Process-wide SDK instance: one registry, one emitter, one redactor
///
/// Lifecycle: initialized once at process start via [`init`], read and
/// written throughout, no explicit teardown. Components hold handles rather
/// than reaching into global mutable state.
pub struct Sdk {
    registry: SeriesRegistry,
    emitter: Arc<Emitter>,
}

impl Sdk {
    /// Build a standalone instance; most services use [`init`] instead
    ///
    /// The registry's hot-path diagnostics are routed through the emitter,
    /// so cardinality overflows and invalid observations reach the
    /// configured sink as loop-guarded Warn records.
    pub fn new(config: Config, sink: Arc<dyn Sink>) -> Self {
        let redactor = Arc::new(Redactor::new(config.redaction_rules.clone()));
        let registry = SeriesRegistry::new(&config, Arc::clone(&redactor));
        let emitter = Arc::new(Emitter::new(&config, redactor, sink));
        registry.set_warn_emitter(Arc::clone(&emitter));
        Self { registry, emitter }
    }

    #[inline]
    pub fn registry(&self) -> &SeriesRegistry {
        &self.registry
    }

    #[inline]
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Snapshot metrics plus emitter meta-counters in one call
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }
}

static SDK: OnceLock<Sdk> = OnceLock::new();

/// Initialize the process-wide SDK
///
/// First call wins; later calls keep the existing instance and log a notice
/// through the `log` facade. Misconfigured metric registrations after init
/// still fail fast at their own `register` call sites.
pub fn init(config: Config, sink: Arc<dyn Sink>) -> &'static Sdk {
    let mut first = false;
    let sdk = SDK.get_or_init(|| {
        first = true;
        Sdk::new(config, sink)
    });
    if !first {
        log::warn!("obskit::init called more than once; keeping the first configuration");
    }
    sdk
}

/// The initialized SDK, if [`init`] has run
pub fn try_get() -> Option<&'static Sdk> {
    SDK.get()
}
