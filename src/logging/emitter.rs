/*!
 * Structured Log Emitter
 * Level gating, field composition, redaction, loop-safe emission
 */

use crate::core::config::Config;
use crate::core::types::{Level, SmallStr};
use crate::logging::guard::{Decision, GuardKey, LoopGuard};
use crate::logging::record::{ErrorInfo, LogRecord};
use crate::logging::sink::Sink;
use crate::metrics::label::LabelSet;
use crate::redact::Redactor;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Emitter meta-counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmitterStats {
    /// Records dropped because the sink write failed
    pub write_failures: u64,
    /// Records swallowed by the loop guard
    pub suppressed: u64,
}

/// Structured log emitter
///
/// Composes a level, message, fields and an optional error payload into one
/// [`LogRecord`], applies level gating, redaction and loop-guard coalescing,
/// then hands the record to the sink. Never blocks the caller on I/O and
/// never surfaces a sink failure.
///
/// Field policy: caller fields are merged under the process-wide ambient
/// set, and ambient wins on conflicts so a call site cannot spoof identity
/// fields like `service` or `instance`.
pub struct Emitter {
    min_level: Level,
    // Redacted once at construction
    ambient: LabelSet,
    redactor: Arc<Redactor>,
    sink: Arc<dyn Sink>,
    guard: LoopGuard,
    write_failures: AtomicU64,
    suppressed: AtomicU64,
}

impl Emitter {
    pub fn new(config: &Config, redactor: Arc<Redactor>, sink: Arc<dyn Sink>) -> Self {
        let ambient = config
            .ambient_fields
            .map_values(|key, value| SmallStr::from(redactor.redact(key, value).as_ref()));
        Self {
            min_level: config.min_level,
            ambient,
            redactor,
            sink,
            guard: LoopGuard::new(config.loop_guard_threshold, config.loop_guard_window),
            write_failures: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Whether a record at `level` would be emitted at all
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    /// Emit a structured record
    ///
    /// `fields` is lazy: it is never invoked when the level is gated off or
    /// the loop guard suppresses the emission.
    #[track_caller]
    pub fn log<F>(&self, level: Level, message: &str, fields: F)
    where
        F: FnOnce() -> LabelSet,
    {
        self.log_inner(level, Location::caller(), message, fields, None);
    }

    /// Emit with an attached error payload
    ///
    /// The record carries the full cause chain (and a backtrace when
    /// enabled), and its level is clamped up to at least `Error`.
    #[track_caller]
    pub fn log_error<F>(&self, level: Level, message: &str, fields: F, error: &(dyn Error + 'static))
    where
        F: FnOnce() -> LabelSet,
    {
        let level = level.max(Level::Error);
        self.log_inner(level, Location::caller(), message, fields, Some(error));
    }

    #[track_caller]
    pub fn trace<F: FnOnce() -> LabelSet>(&self, message: &str, fields: F) {
        self.log_inner(Level::Trace, Location::caller(), message, fields, None);
    }

    #[track_caller]
    pub fn debug<F: FnOnce() -> LabelSet>(&self, message: &str, fields: F) {
        self.log_inner(Level::Debug, Location::caller(), message, fields, None);
    }

    #[track_caller]
    pub fn info<F: FnOnce() -> LabelSet>(&self, message: &str, fields: F) {
        self.log_inner(Level::Info, Location::caller(), message, fields, None);
    }

    #[track_caller]
    pub fn warn<F: FnOnce() -> LabelSet>(&self, message: &str, fields: F) {
        self.log_inner(Level::Warn, Location::caller(), message, fields, None);
    }

    #[track_caller]
    pub fn error<F: FnOnce() -> LabelSet>(&self, message: &str, fields: F) {
        self.log_inner(Level::Error, Location::caller(), message, fields, None);
    }

    fn log_inner<F>(
        &self,
        level: Level,
        site: &'static Location<'static>,
        message: &str,
        fields: F,
        error: Option<&(dyn Error + 'static)>,
    ) where
        F: FnOnce() -> LabelSet,
    {
        if !self.enabled(level) {
            return;
        }

        let guard_key = GuardKey::new(format_site(site), message);
        match self.guard.admit(guard_key, level) {
            Decision::Suppress => {
                self.suppressed.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Decision::EmitWithSummary {
                level: burst_level,
                suppressed,
            } => {
                self.write_summary(burst_level, site, message, suppressed);
            }
            Decision::Emit => {}
        }

        let composed = self.compose_fields(fields());
        let payload = error.map(ErrorInfo::capture);
        self.write(LogRecord::new(level, message, composed, payload));
    }

    /// Close open loop-guard bursts and emit their summaries
    ///
    /// The explicit batch-end signal; also the only way pending summaries
    /// surface without further emissions at the same call site. Each summary
    /// carries the highest level seen in its burst.
    pub fn flush(&self) {
        for (key, level, suppressed) in self.guard.flush() {
            let fields = LabelSet::builder()
                .field("suppressed", suppressed)
                .field("call_site", &key.site)
                .field("coalesced", "true")
                .build();
            let composed = self.compose_fields(fields);
            self.write(LogRecord::new(level, key.message.as_str(), composed, None));
        }
    }

    pub fn stats(&self) -> EmitterStats {
        EmitterStats {
            write_failures: self.write_failures.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
        }
    }

    // Redact caller fields, then merge under ambient (ambient wins)
    fn compose_fields(&self, caller: LabelSet) -> LabelSet {
        let redacted = caller
            .map_values(|key, value| SmallStr::from(self.redactor.redact(key, value).as_ref()));
        self.ambient.merge_over(&redacted)
    }

    fn write_summary(
        &self,
        level: Level,
        site: &'static Location<'static>,
        message: &str,
        suppressed: u64,
    ) {
        let fields = LabelSet::builder()
            .field("suppressed", suppressed)
            .field("call_site", format_site(site))
            .field("coalesced", "true")
            .build();
        let composed = self.compose_fields(fields);
        self.write(LogRecord::new(level, message, composed, None));
    }

    // Failed writes are counted and the record dropped; a broken sink never
    // breaks the calling business logic
    fn write(&self, record: LogRecord) {
        if self.sink.write(&record).is_err() {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn format_site(site: &Location<'_>) -> SmallStr {
    let mut s = SmallStr::new();
    use std::fmt::Write;
    let _ = write!(s, "{}:{}", site.file(), site.line());
    s
}
