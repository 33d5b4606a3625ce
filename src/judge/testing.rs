//! Scripted judge for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::errors::JudgeError;
use crate::session::ReviewStage;

use super::{Inquiry, InquiryRequest, ReviewJudge, ReviewRequest, Verdict};

/// Replays queued outcomes in order. Runs out into `503` errors.
pub(crate) struct ScriptedJudge {
    latency: Duration,
    verdicts: Mutex<VecDeque<Result<Verdict, JudgeError>>>,
    inquiries: Mutex<VecDeque<Result<Inquiry, JudgeError>>>,
    calls: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<ReviewRequest>>,
}

impl ScriptedJudge {
    pub(crate) fn new(latency: Duration) -> Self {
        Self {
            latency,
            verdicts: Mutex::new(VecDeque::new()),
            inquiries: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn pass(self, stage: ReviewStage) -> Self {
        self.then(Ok(Verdict {
            passed: true,
            message: format!("{} 통과", stage),
            sender_id: stage.sender_id().to_string(),
        }))
    }

    pub(crate) fn fail(self, stage: ReviewStage, message: &str) -> Self {
        self.then(Ok(Verdict {
            passed: false,
            message: message.to_string(),
            sender_id: stage.sender_id().to_string(),
        }))
    }

    pub(crate) fn error(self, error: JudgeError) -> Self {
        self.then(Err(error))
    }

    pub(crate) fn then(self, outcome: Result<Verdict, JudgeError>) -> Self {
        self.verdicts.lock().unwrap().push_back(outcome);
        self
    }

    pub(crate) fn ask(self, question: &str) -> Self {
        self.inquiries.lock().unwrap().push_back(Ok(Inquiry {
            message: question.to_string(),
            sender_id: "dev-senior".to_string(),
        }));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn requests(&self) -> Vec<ReviewRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewJudge for ScriptedJudge {
    async fn request_verdict(&self, request: &ReviewRequest) -> Result<Verdict, JudgeError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.latency).await;
        let next = self.verdicts.lock().unwrap().pop_front();
        next.unwrap_or(Err(JudgeError::Status { status: 503 }))
    }

    async fn request_inquiry(&self, _request: &InquiryRequest) -> Result<Inquiry, JudgeError> {
        self.calls.lock().unwrap().push(Instant::now());
        tokio::time::sleep(self.latency).await;
        let next = self.inquiries.lock().unwrap().pop_front();
        next.unwrap_or(Err(JudgeError::Status { status: 503 }))
    }
}
