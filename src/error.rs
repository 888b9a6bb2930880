//! Error types for the collection pipeline.

use thiserror::Error;

/// Errors that abort a processing run.
///
/// Input errors are fatal: a stream the engine cannot fully parse must not
/// produce any action output (a skipped dead record is a leaked replica, a
/// guessed one is a lost object). Remote delete failures are not represented
/// here; the executor surfaces those as events and counters and keeps going.
#[derive(Debug, Error)]
pub enum GcError {
    /// An input line did not match the expected field layout.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// A dead record carried a payload blob that could not be parsed.
    #[error("unparsable dead payload at line {line} for object {object_id}: {source}")]
    MalformedPayload {
        line: u64,
        object_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// A metadata-delete action was routed to a cleaner for another shard.
    #[error("action for target {actual} routed to cleaner for {expected}")]
    TargetMismatch { expected: String, actual: String },

    /// The metadata client could not be set up or its worker died.
    #[error("metadata client error for {target}: {reason}")]
    Client { target: String, reason: String },

    /// Invalid runtime configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GcError {
    /// Creates a malformed-record error for the given 1-based line number.
    pub fn malformed(line: u64, reason: impl Into<String>) -> Self {
        GcError::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    /// Creates a client error for the given target.
    pub fn client(target: impl Into<String>, reason: impl Into<String>) -> Self {
        GcError::Client {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for collection operations.
pub type GcResult<T> = Result<T, GcError>;
