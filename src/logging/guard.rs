/*!
 * Loop Guard
 * Coalesces repeated identical emissions inside tight loops
 */

use crate::core::types::{Level, SmallStr};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// Expired no-suppression windows are reclaimed every this many admissions
const SWEEP_INTERVAL: u64 = 1024;

/// Identity of a repeated emission: call site plus message template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuardKey {
    pub site: SmallStr,
    pub message: SmallStr,
}

impl GuardKey {
    pub fn new(site: impl Into<SmallStr>, message: impl Into<SmallStr>) -> Self {
        Self {
            site: site.into(),
            message: message.into(),
        }
    }
}

/// Admission decision for one emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Under threshold: emit normally
    Emit,
    /// Over threshold inside the window: swallow the record
    Suppress,
    /// A previous burst just closed: emit a summary for it at the burst's
    /// level, then the record
    EmitWithSummary { level: Level, suppressed: u64 },
}

// Open window per call site. Carries the highest level seen in the burst so
// the eventual summary never understates its severity.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    level: Level,
    emitted: u32,
    suppressed: u64,
}

/// Per-call-site emission rate guard
///
/// The first `threshold` emissions of a (site, message) pair inside a window
/// pass through; further ones are suppressed and coalesced into a single
/// summary, emitted when the burst ends (lazily at the next admission past
/// the window, or on an explicit [`LoopGuard::flush`]). No background
/// thread; expired windows with nothing pending are reclaimed inline every
/// `SWEEP_INTERVAL` admissions so dynamic message templates cannot grow the
/// state map without bound.
#[derive(Debug)]
pub struct LoopGuard {
    threshold: u32,
    window: Duration,
    states: DashMap<GuardKey, Window, RandomState>,
    admissions: AtomicU64,
}

impl LoopGuard {
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            window,
            states: DashMap::with_hasher(RandomState::new()),
            admissions: AtomicU64::new(0),
        }
    }

    /// Decide whether this emission passes, updating window state
    #[inline]
    pub fn admit(&self, key: GuardKey, level: Level) -> Decision {
        self.admit_at(key, level, Instant::now())
    }

    fn admit_at(&self, key: GuardKey, level: Level, now: Instant) -> Decision {
        if self.admissions.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep(now);
        }
        match self.states.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(Window {
                    started: now,
                    level,
                    emitted: 1,
                    suppressed: 0,
                });
                Decision::Emit
            }
            Entry::Occupied(mut slot) => {
                let state = slot.get_mut();
                if now.duration_since(state.started) >= self.window {
                    // Previous window closed; this emission opens a new one
                    let (prior_level, suppressed) = (state.level, state.suppressed);
                    *state = Window {
                        started: now,
                        level,
                        emitted: 1,
                        suppressed: 0,
                    };
                    if suppressed > 0 {
                        Decision::EmitWithSummary {
                            level: prior_level,
                            suppressed,
                        }
                    } else {
                        Decision::Emit
                    }
                } else if state.emitted < self.threshold {
                    state.emitted += 1;
                    state.level = state.level.max(level);
                    Decision::Emit
                } else {
                    state.suppressed += 1;
                    state.level = state.level.max(level);
                    Decision::Suppress
                }
            }
        }
    }

    // Expired windows with no pending summary hold no information; dynamic
    // messages would otherwise each pin one entry for the process lifetime
    fn sweep(&self, now: Instant) {
        self.states.retain(|_, state| {
            state.suppressed > 0 || now.duration_since(state.started) < self.window
        });
    }

    /// Close every open burst, dropping its state, and return pending
    /// summaries as (key, burst level, suppressed count)
    ///
    /// The explicit "batch end" signal: call when a processing batch
    /// finishes so suppressed counts become visible without waiting for the
    /// next emission.
    pub fn flush(&self) -> Vec<(GuardKey, Level, u64)> {
        let mut summaries = Vec::new();
        self.states.retain(|key, state| {
            if state.suppressed > 0 {
                summaries.push((key.clone(), state.level, state.suppressed));
            }
            false
        });
        summaries
    }

    #[cfg(test)]
    fn admit_after(&self, key: GuardKey, level: Level, offset: Duration) -> Decision {
        self.admit_at(key, level, Instant::now() + offset)
    }

    #[cfg(test)]
    fn tracked_sites(&self) -> usize {
        self.states.len()
    }
}
