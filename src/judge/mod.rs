//! Review judge client.
//!
//! The judge is the external service that grades a draft for one review stage.
//! [`HttpJudge`] performs a single request against it; [`RetryingJudge`] adds the
//! per-attempt deadline and backoff schedule. Callers that get an error back
//! substitute [`fallback_verdict`] for the stage.
//!
//! | Type | Role |
//! |------|------|
//! | [`ReviewJudge`] | Async seam used by the orchestrator |
//! | [`HttpJudge`] | One HTTP attempt, no retries |
//! | [`RetryingJudge`] | Timeout + bounded retry around any judge |

pub mod client;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use client::HttpJudge;
pub use retry::{RetryPolicy, RetryingJudge};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::JudgeError;
use crate::session::model::senders;
use crate::session::{Difficulty, ReviewStage};

fn default_difficulty() -> Difficulty {
    Difficulty::Normal
}

/// Body of a review request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub prd_content: String,
    pub review_stage: ReviewStage,
    pub stage_attempts: u32,
    #[serde(default = "default_difficulty")]
    pub mission_difficulty: Difficulty,
}

/// A reviewer's decision on the current draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub passed: bool,
    pub message: String,
    pub sender_id: String,
}

/// Body of a developer follow-up question request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRequest {
    pub prd_content: String,
    #[serde(default)]
    pub attempt: u32,
}

/// A follow-up question from the developer persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub message: String,
    pub sender_id: String,
}

/// Verdict used when the judge could not be reached for `stage`.
pub fn fallback_verdict(stage: ReviewStage) -> Verdict {
    Verdict {
        passed: false,
        message: stage.fallback_message().to_string(),
        sender_id: stage.sender_id().to_string(),
    }
}

/// Question used when the judge could not produce a follow-up.
pub fn fallback_inquiry() -> Inquiry {
    Inquiry {
        message: ReviewStage::Developer.fallback_message().to_string(),
        sender_id: senders::DEVELOPER.to_string(),
    }
}

#[async_trait]
pub trait ReviewJudge: Send + Sync {
    async fn request_verdict(&self, request: &ReviewRequest) -> Result<Verdict, JudgeError>;

    async fn request_inquiry(&self, request: &InquiryRequest) -> Result<Inquiry, JudgeError>;
}
