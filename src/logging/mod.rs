/*!
 * Structured Logging
 * Record composition, loop-guarded emission, and sinks
 */

pub mod emitter;
pub mod guard;
pub mod record;
pub mod sink;

pub use emitter::{Emitter, EmitterStats};
pub use guard::{Decision, GuardKey, LoopGuard};
pub use record::{ErrorInfo, LogRecord};
pub use sink::{BufferSink, CaptureSink, JsonLineSink, Sink, TracingSink};
