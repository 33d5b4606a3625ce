//! Typed error hierarchy for SimuLearn.
//!
//! One enum per subsystem:
//! - `JudgeError`: review judge calls (transport, status, payload, deadline)
//! - `StoreError`: persisted snapshot reads and writes
//! - `SessionError`: orchestrator operations rejected at the boundary
//! - `LlmError`: the judge service's upstream language model calls

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::session::Step;

/// Errors from a single judge attempt, or from the retry loop as a whole.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Judge request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Judge returned status {status}")]
    Status { status: u16 },

    #[error("Judge rate limit exceeded")]
    RateLimited,

    #[error("Malformed judge response: {0}")]
    MalformedResponse(String),

    #[error("Judge did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Judge unavailable after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<JudgeError>,
    },
}

impl JudgeError {
    /// Status code carried by the error, if the judge answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            JudgeError::Status { status } => Some(*status),
            JudgeError::RateLimited => Some(429),
            JudgeError::Exhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

/// Errors from the persisted snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access snapshot at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Snapshot store rejected the write: {0}")]
    Rejected(String),
}

/// Errors from orchestrator operations invoked in the wrong state or with bad input.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot {operation} during {actual}; expected {expected}")]
    WrongPhase {
        operation: &'static str,
        expected: Step,
        actual: Step,
    },

    #[error("The mission has not started yet")]
    MissionNotStarted,

    #[error("Cannot submit an empty draft")]
    EmptyDraft,

    #[error("All review stages must pass before continuing")]
    ReviewIncomplete,
}

/// Errors from the language model backing the judge service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Unexpected LLM response: {0}")]
    Malformed(String),

    #[error("LLM returned an empty completion")]
    EmptyCompletion,
}
