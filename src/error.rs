//! Error taxonomy for the search/poll engine.
//!
//! Errors are split by how the caller is expected to react:
//!
//! - `Auth` is fatal to engine construction and never retried.
//! - `TopicNotFound` is fatal to the specific search call.
//! - `Transport` is transient; the polling orchestrator tolerates it up to
//!   its attempt cap.
//! - `FailureStage` is a fail-fast business signal from the pipeline itself.
//! - `MaxAttempts` is the orchestrator's conversion of a stalled or
//!   persistently failing poll into a terminal failure.
//!
//! Per-event decode problems never become an `EngineError`: a malformed event
//! is logged and dropped at the decoding layer, and the rest of the batch
//! survives.

use crate::traits::HttpError;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error type for the search/poll engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Login or session verification against the broker UI failed.
    #[error("authentication failed: {reason}")]
    Auth { reason: String },

    /// The requested topic does not exist (or reports zero partitions).
    #[error("topic not found: {topic}")]
    TopicNotFound { topic: String },

    /// The broker was unreachable or answered with a non-2xx status.
    ///
    /// `status` is `None` when the request never produced a response
    /// (connection refused, timeout, ...).
    #[error("transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The tracked submission entered the pipeline's declared failure stage.
    #[error("submission {submission} reported pipeline failure: {message}")]
    FailureStage {
        submission: String,
        message: String,
    },

    /// A polling session exceeded its hard attempt cap without success.
    #[error("max poll attempts reached after {attempts} attempts")]
    MaxAttempts { attempts: u32 },
}

impl EngineError {
    /// The HTTP status attached to a transport error, if any.
    pub fn transport_status(&self) -> Option<u16> {
        match self {
            EngineError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the polling orchestrator may keep ticking past this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transport { .. })
    }
}

impl From<HttpError> for EngineError {
    fn from(err: HttpError) -> Self {
        EngineError::Transport {
            status: None,
            message: err.to_string(),
        }
    }
}
