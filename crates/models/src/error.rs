use serde::{Deserialize, Serialize};

/// The taxonomy of failure kinds the pipeline distinguishes. Kinds, not
/// exception class names: callers match on these to decide whether to
/// abort a phase or merely record a warning and continue.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Source not found, unsupported format, invalid JSON, missing
    /// required metadata. Always fatal; fails the `extract` phase.
    #[error("input error: {0}")]
    Input(String),

    /// Malformed configuration: non-positive sizes, missing DB fields.
    /// Fatal before the pipeline starts.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// Raw data missing `conversations`, a conversation missing its
    /// message list, and similar shape violations. Fatal; fails the
    /// phase in which it's detected.
    #[error("structural error in {phase}: {message}")]
    Structural { phase: String, message: String },

    /// A single message couldn't be parsed by its handler. Always
    /// non-fatal: the message is retained with base fields only.
    #[error("content error for message {message_id}: {message}")]
    Content { message_id: String, message: String },

    /// Memory pressure or connection pool exhaustion. Non-fatal for
    /// memory; fatal for pool exhaustion that persists after retry.
    #[error("resource error: {0}")]
    Resource(String),

    /// Constraint violation, connection loss, transaction failure.
    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PipelineError {
    /// The taxonomy label used in logs and the run summary, independent
    /// of the variant's formatted message.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Input(_) => "input",
            PipelineError::Validation(_) => "validation",
            PipelineError::Structural { .. } => "structural",
            PipelineError::Content { .. } => "content",
            PipelineError::Resource(_) => "resource",
            PipelineError::Database(_) => "database",
        }
    }

    /// Whether this kind of error is inherently fatal to its phase.
    /// Content errors are never fatal; everything else defaults to fatal
    /// unless the caller knows better (e.g. a single retried resource
    /// error).
    pub fn is_inherently_fatal(&self) -> bool {
        !matches!(self, PipelineError::Content { .. })
    }
}

/// One entry in the Context's retained error log, independent of the
/// `PipelineError` variant that produced it so it can be serialized into
/// the run summary without needing `PipelineError` itself to be
/// (de)serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub phase: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub fatal: bool,
}
