//! Per-attempt deadline and bounded retry around a [`ReviewJudge`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::JudgeError;

use super::{Inquiry, InquiryRequest, ReviewJudge, ReviewRequest, Verdict};

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_RETRY_DELAYS: [Duration; 2] =
    [Duration::from_millis(300), Duration::from_millis(800)];

/// Retry schedule. `delays[i]` is the pause after failed attempt `i + 1`;
/// the number of attempts is `delays.len() + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempt_timeout: Duration,
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            delays: DEFAULT_RETRY_DELAYS.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.delays.len() as u32 + 1
    }
}

pub struct RetryingJudge<J> {
    inner: J,
    policy: RetryPolicy,
}

impl<J: ReviewJudge> RetryingJudge<J> {
    pub fn new(inner: J, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &J {
        &self.inner
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, JudgeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, JudgeError>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.policy.attempt_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(JudgeError::Timeout(self.policy.attempt_timeout)),
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "judge call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            match self.policy.delays.get(attempt as usize - 1) {
                Some(delay) => {
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %error,
                        "judge call failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
                None => {
                    tracing::warn!(
                        operation,
                        attempts = attempt,
                        error = %error,
                        "judge call failed, giving up"
                    );
                    return Err(JudgeError::Exhausted {
                        attempts: attempt,
                        last: Box::new(error),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl<J: ReviewJudge> ReviewJudge for RetryingJudge<J> {
    async fn request_verdict(&self, request: &ReviewRequest) -> Result<Verdict, JudgeError> {
        self.run("feedback", || self.inner.request_verdict(request))
            .await
    }

    async fn request_inquiry(&self, request: &InquiryRequest) -> Result<Inquiry, JudgeError> {
        self.run("dev-inquiry", || self.inner.request_inquiry(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::testing::ScriptedJudge;
    use crate::session::{Difficulty, ReviewStage};
    use tokio::time::Instant;

    fn request() -> ReviewRequest {
        ReviewRequest {
            prd_content: "draft".into(),
            review_stage: ReviewStage::Designer,
            stage_attempts: 0,
            mission_difficulty: Difficulty::Normal,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fail_succeed_uses_backoff_schedule() {
        let scripted = ScriptedJudge::new(Duration::ZERO)
            .error(JudgeError::Status { status: 500 })
            .error(JudgeError::RateLimited)
            .pass(ReviewStage::Designer)
            .pass(ReviewStage::Designer);
        let judge = RetryingJudge::new(scripted, RetryPolicy::default());

        let start = Instant::now();
        let verdict = judge.request_verdict(&request()).await.unwrap();
        assert!(verdict.passed);

        let calls = judge.inner().calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1] - calls[0], Duration::from_millis(300));
        assert_eq!(calls[2] - calls[1], Duration::from_millis(800));
        assert_eq!(start.elapsed(), Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_three_attempts() {
        let scripted = ScriptedJudge::new(Duration::ZERO)
            .error(JudgeError::Status { status: 500 })
            .error(JudgeError::Status { status: 502 })
            .error(JudgeError::Status { status: 503 })
            .pass(ReviewStage::Designer);
        let judge = RetryingJudge::new(scripted, RetryPolicy::default());

        let err = judge.request_verdict(&request()).await.unwrap_err();
        match err {
            JudgeError::Exhausted { attempts, ref last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.status(), Some(503));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(judge.inner().calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_hits_deadline() {
        let scripted = ScriptedJudge::new(Duration::from_secs(20))
            .pass(ReviewStage::Designer)
            .pass(ReviewStage::Designer)
            .pass(ReviewStage::Designer);
        let judge = RetryingJudge::new(scripted, RetryPolicy::default());

        let start = Instant::now();
        let err = judge.request_verdict(&request()).await.unwrap_err();
        match err {
            JudgeError::Exhausted { last, .. } => {
                assert!(matches!(*last, JudgeError::Timeout(_)))
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(
            start.elapsed(),
            Duration::from_secs(45) + Duration::from_millis(1100)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_makes_one_call() {
        let scripted = ScriptedJudge::new(Duration::from_millis(50)).fail(ReviewStage::Designer, "다시");
        let judge = RetryingJudge::new(scripted, RetryPolicy::default());
        let verdict = judge.request_verdict(&request()).await.unwrap();
        assert!(!verdict.passed);
        assert_eq!(judge.inner().calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inquiry_uses_same_schedule() {
        let scripted = ScriptedJudge::new(Duration::ZERO).ask("예외 상황은요?");
        let judge = RetryingJudge::new(
            scripted,
            RetryPolicy {
                attempt_timeout: Duration::from_secs(1),
                delays: vec![Duration::from_millis(10)],
            },
        );
        let inquiry = judge
            .request_inquiry(&InquiryRequest {
                prd_content: "draft".into(),
                attempt: 0,
            })
            .await
            .unwrap();
        assert_eq!(inquiry.message, "예외 상황은요?");
        assert_eq!(judge.policy().max_attempts(), 2);
    }
}
