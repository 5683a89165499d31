/*!
 * Log Records
 * Immutable structured records handed to the sink and discarded
 */

use crate::core::types::{Level, SmallStr};
use crate::metrics::label::LabelSet;
use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::time::{SystemTime, UNIX_EPOCH};

/// One structured log record
///
/// Created once per emission, immutable, value-owned; the emitter hands it
/// to the sink and drops it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Wall-clock microseconds since the Unix epoch
    pub timestamp_us: u64,
    pub level: Level,
    pub message: SmallStr,
    /// Caller fields merged under the ambient set, already redacted
    pub fields: LabelSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl LogRecord {
    pub(crate) fn new(level: Level, message: &str, fields: LabelSet, error: Option<ErrorInfo>) -> Self {
        Self {
            timestamp_us: now_us(),
            level,
            message: message.into(),
            fields,
            error,
        }
    }
}

/// Error payload: message, cause chain, optional backtrace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    /// Source chain from outermost cause inward
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub chain: Vec<String>,
    /// Present when backtraces are enabled (RUST_BACKTRACE)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub backtrace: Option<String>,
}

impl ErrorInfo {
    /// Capture the full cause chain and, when enabled, a backtrace
    pub fn capture(error: &(dyn Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        let backtrace = {
            let bt = Backtrace::capture();
            match bt.status() {
                BacktraceStatus::Captured => Some(bt.to_string()),
                _ => None,
            }
        };

        Self {
            message: error.to_string(),
            chain,
            backtrace,
        }
    }
}

#[inline]
fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
