/*!
 * Series Registry
 * Owns all metric series, routes observations, enforces cardinality
 */

use crate::core::config::Config;
use crate::core::errors::MetricError;
use crate::core::types::{Level, MetricKind, MetricResult, SmallStr};
use crate::logging::emitter::Emitter;
use crate::logging::guard::{Decision, GuardKey, LoopGuard};
use crate::metrics::label::LabelSet;
use crate::metrics::name::MetricName;
use crate::metrics::series::{Series, SeriesSnapshot};
use crate::redact::Redactor;
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Label value a metric's observations coalesce under once its cardinality
/// ceiling is hit
const OVERFLOW_LABEL: &str = "overflow";

// Per-metric-name registration record. Label key schema is fixed by the
// first registration; only a kind mismatch is an error.
#[derive(Debug)]
struct MetricMeta {
    name: MetricName,
    kind: MetricKind,
    label_keys: Box<[SmallStr]>,
    cardinality: AtomicUsize,
}

// Series identity: metric name + label set content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    name: SmallStr,
    labels: LabelSet,
}

/// Handle onto a registered metric
///
/// Cheap to clone and to stash in per-component state; observations go
/// through [`SeriesRegistry::observe`] and friends.
#[derive(Debug, Clone)]
pub struct SeriesHandle {
    meta: Arc<MetricMeta>,
}

impl SeriesHandle {
    #[inline]
    pub fn name(&self) -> &MetricName {
        &self.meta.name
    }

    #[inline]
    pub fn kind(&self) -> MetricKind {
        self.meta.kind
    }
}

/// Internal diagnostic counters, exposed in snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegistryDiagnostics {
    pub invalid_observations: u64,
    pub cardinality_rejections: u64,
}

/// Point-in-time view of every series
///
/// Per-series consistent, not linearizable across series; taking it never
/// blocks ongoing observations on unrelated series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub series: Vec<SeriesSnapshot>,
    pub uptime_secs: u64,
    pub diagnostics: RegistryDiagnostics,
}

/// Process-wide metric series owner
///
/// Series are created lazily on first observation (atomic per shard, no two
/// aggregators for the same key), live for the process lifetime, and are
/// bounded per metric name by the cardinality ceiling. Label values pass
/// through the redactor before becoming series identity.
///
/// # Performance
/// - Cache-line aligned to prevent false sharing in high-frequency updates
#[repr(C, align(64))]
pub struct SeriesRegistry {
    metas: DashMap<SmallStr, Arc<MetricMeta>, RandomState>,
    series: DashMap<SeriesKey, Arc<Series>, RandomState>,
    buckets: Box<[f64]>,
    ceiling: usize,
    redactor: Arc<Redactor>,
    // Hot-path errors are reported here at most once per window, never
    // raised to the caller
    warn_guard: LoopGuard,
    // Set when an emitter owns diagnostics; the log facade is the fallback
    warn_emitter: OnceLock<Arc<Emitter>>,
    invalid_observations: AtomicU64,
    cardinality_rejections: AtomicU64,
    start_time: Instant,
}

impl SeriesRegistry {
    pub fn new(config: &Config, redactor: Arc<Redactor>) -> Self {
        Self {
            metas: DashMap::with_hasher(RandomState::new()),
            series: DashMap::with_hasher(RandomState::new()),
            buckets: config.histogram_buckets.clone().into_boxed_slice(),
            ceiling: config.cardinality_ceiling.max(1),
            redactor,
            warn_guard: LoopGuard::new(1, config.loop_guard_window),
            warn_emitter: OnceLock::new(),
            invalid_observations: AtomicU64::new(0),
            cardinality_rejections: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Registry with default config and redaction, mainly for tests
    pub fn with_defaults() -> Self {
        let config = Config::default();
        let redactor = Arc::new(Redactor::new(config.redaction_rules.clone()));
        Self::new(&config, redactor)
    }

    // Route hot-path diagnostics through the emitter so they reach the
    // configured sink; first wiring wins
    pub(crate) fn set_warn_emitter(&self, emitter: Arc<Emitter>) {
        let _ = self.warn_emitter.set(emitter);
    }

    /// Register a metric name with its kind and label key schema
    ///
    /// Fails fast with [`MetricError::InvalidName`] on a malformed name and
    /// [`MetricError::KindConflict`] if the name was registered with a
    /// different kind. Re-registering with the same kind returns a handle
    /// onto the original schema.
    pub fn register(
        &self,
        raw_name: &str,
        kind: MetricKind,
        label_keys: &[&str],
    ) -> MetricResult<SeriesHandle> {
        let name = MetricName::parse(raw_name, kind)?;
        let meta = match self.metas.entry(name.as_small().clone()) {
            Entry::Occupied(existing) => {
                let meta = existing.get();
                if meta.kind != kind {
                    return Err(MetricError::KindConflict {
                        name: name.as_small().clone(),
                        existing: meta.kind,
                        requested: kind,
                    });
                }
                Arc::clone(meta)
            }
            Entry::Vacant(slot) => {
                let meta = Arc::new(MetricMeta {
                    name,
                    kind,
                    label_keys: label_keys.iter().map(|k| SmallStr::from(*k)).collect(),
                    cardinality: AtomicUsize::new(0),
                });
                slot.insert(Arc::clone(&meta));
                meta
            }
        };
        Ok(SeriesHandle { meta })
    }

    /// Fold one observation into the series for (handle, label values)
    ///
    /// Hot path: never fails, never blocks on unrelated series. Invalid
    /// observations, mismatched label arity, and cardinality overflows are
    /// counted internally and reported at most once per window.
    pub fn observe(&self, handle: &SeriesHandle, label_values: &[&str], value: f64) {
        let Some(labels) = self.checked_labels(handle, label_values) else {
            return;
        };
        let series = self.get_or_create(handle, labels);
        if let Err(err) = series.apply(value) {
            self.invalid_observations.fetch_add(1, Ordering::Relaxed);
            self.warn_once(handle, &err);
        }
    }

    /// Increment a counter series by 1
    #[inline]
    pub fn increment(&self, handle: &SeriesHandle, label_values: &[&str]) {
        self.observe(handle, label_values, 1.0);
    }

    /// Add a delta to a counter series
    #[inline]
    pub fn add(&self, handle: &SeriesHandle, label_values: &[&str], delta: f64) {
        self.observe(handle, label_values, delta);
    }

    /// Set a gauge series
    #[inline]
    pub fn set(&self, handle: &SeriesHandle, label_values: &[&str], value: f64) {
        self.observe(handle, label_values, value);
    }

    /// Record an operation duration into a histogram series
    #[inline]
    pub fn record_duration(&self, handle: &SeriesHandle, label_values: &[&str], duration: Duration) {
        self.observe(handle, label_values, duration.as_secs_f64());
    }

    /// Start a timer that records its elapsed time on drop or [`Timer::stop`]
    pub fn start_timer(&self, handle: &SeriesHandle, label_values: &[&str]) -> Timer {
        let series = self
            .checked_labels(handle, label_values)
            .map(|labels| self.get_or_create(handle, labels));
        Timer {
            start: Instant::now(),
            series,
        }
    }

    /// Snapshot every series, sorted by (name, labels) for stable output
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut series: Vec<SeriesSnapshot> =
            self.series.iter().map(|entry| entry.value().snapshot()).collect();
        series.sort_by(|a, b| {
            a.name
                .as_str()
                .cmp(b.name.as_str())
                .then_with(|| a.labels.cmp(&b.labels))
        });

        RegistrySnapshot {
            series,
            uptime_secs: self.start_time.elapsed().as_secs(),
            diagnostics: self.diagnostics(),
        }
    }

    pub fn diagnostics(&self) -> RegistryDiagnostics {
        RegistryDiagnostics {
            invalid_observations: self.invalid_observations.load(Ordering::Relaxed),
            cardinality_rejections: self.cardinality_rejections.load(Ordering::Relaxed),
        }
    }

    /// Distinct label sets recorded for a metric name
    pub fn cardinality(&self, handle: &SeriesHandle) -> usize {
        handle.meta.cardinality.load(Ordering::Relaxed)
    }

    // Arity mismatches are caller bugs: the observation is dropped, counted
    // and reported, never recorded under an ambiguous label identity
    fn checked_labels(&self, handle: &SeriesHandle, label_values: &[&str]) -> Option<LabelSet> {
        let expected = handle.meta.label_keys.len();
        if label_values.len() != expected {
            self.invalid_observations.fetch_add(1, Ordering::Relaxed);
            self.warn_once(
                handle,
                &MetricError::InvalidObservation {
                    name: handle.meta.name.as_small().clone(),
                    reason: format!(
                        "expected {expected} label values, got {}",
                        label_values.len()
                    )
                    .into(),
                },
            );
            return None;
        }
        Some(
            LabelSet::zip(&handle.meta.label_keys, label_values)
                .map_values(|key, value| SmallStr::from(self.redactor.redact(key, value).as_ref())),
        )
    }

    fn get_or_create(&self, handle: &SeriesHandle, labels: LabelSet) -> Arc<Series> {
        let key = SeriesKey {
            name: handle.meta.name.as_small().clone(),
            labels,
        };

        // Fast path: series already exists
        if let Some(existing) = self.series.get(&key) {
            return Arc::clone(existing.value());
        }

        let meta = &handle.meta;
        let created = match self.series.entry(key) {
            Entry::Occupied(existing) => Some(Arc::clone(existing.get())),
            Entry::Vacant(slot) => {
                // Shard is locked: lookup + creation are atomic, no two
                // aggregators for the same key
                let admitted = meta
                    .cardinality
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                        (current < self.ceiling).then_some(current + 1)
                    })
                    .is_ok();
                if admitted {
                    let series = Arc::new(Series::new(
                        meta.name.clone(),
                        slot.key().labels.clone(),
                        meta.kind,
                        &self.buckets,
                    ));
                    slot.insert(Arc::clone(&series));
                    Some(series)
                } else {
                    None
                }
            }
        };
        // Entry guard dropped above; the overflow path takes its own shard
        // lock on a different key
        match created {
            Some(series) => series,
            None => {
                self.cardinality_rejections.fetch_add(1, Ordering::Relaxed);
                let err = MetricError::CardinalityExceeded {
                    name: meta.name.as_small().clone(),
                    ceiling: self.ceiling,
                };
                self.warn_once(handle, &err);
                self.overflow_series(handle)
            }
        }
    }

    // Coalescing bucket for observations past the ceiling; created outside
    // the cardinality count so existing series keep working
    fn overflow_series(&self, handle: &SeriesHandle) -> Arc<Series> {
        let meta = &handle.meta;
        let key = SeriesKey {
            name: meta.name.as_small().clone(),
            labels: LabelSet::new().with(OVERFLOW_LABEL, "true"),
        };
        match self.series.entry(key) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                let series = Arc::new(Series::new(
                    meta.name.clone(),
                    slot.key().labels.clone(),
                    meta.kind,
                    &self.buckets,
                ));
                slot.insert(Arc::clone(&series));
                series
            }
        }
    }

    fn warn_once(&self, handle: &SeriesHandle, err: &MetricError) {
        let message = err.to_string();
        let key = GuardKey::new(handle.meta.name.as_small().clone(), message.clone());
        let suppressed = match self.warn_guard.admit(key, Level::Warn) {
            Decision::Emit => 0,
            Decision::EmitWithSummary { suppressed, .. } => suppressed,
            Decision::Suppress => return,
        };
        match self.warn_emitter.get() {
            Some(emitter) => {
                let metric = handle.meta.name.as_str();
                emitter.log(Level::Warn, &message, || {
                    let mut fields = LabelSet::builder().field("metric", metric);
                    if suppressed > 0 {
                        fields = fields.field("suppressed", suppressed);
                    }
                    fields.build()
                });
            }
            None if suppressed > 0 => {
                log::warn!("{message} ({suppressed} occurrences suppressed in the last window)");
            }
            None => log::warn!("{message}"),
        }
    }
}

/// RAII duration recorder
///
/// Observes the elapsed time into its histogram series when dropped or
/// explicitly stopped, whichever comes first.
pub struct Timer {
    start: Instant,
    series: Option<Arc<Series>>,
}

impl Timer {
    /// Stop the timer and return the elapsed duration
    pub fn stop(mut self) -> Duration {
        let duration = self.start.elapsed();
        if let Some(series) = self.series.take() {
            let _ = series.apply(duration.as_secs_f64());
        }
        duration
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(series) = self.series.take() {
            let _ = series.apply(self.start.elapsed().as_secs_f64());
        }
    }
}
