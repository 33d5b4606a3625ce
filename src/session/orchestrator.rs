//! Session orchestrator.
//!
//! Owns one [`Session`] and applies every user operation to it. A review
//! (`submit`) is the only operation that waits on the network:
//!
//! 1. Claim the in-flight guard; a second caller gets [`SubmitOutcome::Ignored`].
//! 2. Ask the judge for a verdict, substituting the stage fallback on error.
//! 3. Hold the result until the minimum review time has passed.
//! 4. Append the reviewer's message, then update stage, attempts and gauge together.
//! 5. Schedule a debounced snapshot write.
//!
//! A reset bumps the session generation; a review that started under an older
//! generation is dropped when it returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::errors::SessionError;
use crate::judge::{
    Inquiry, InquiryRequest, ReviewJudge, ReviewRequest, Verdict, fallback_inquiry, fallback_verdict,
};

use super::gauge::{FAILURE_PENALTY, MoraleGauge};
use super::hints::{HelpTip, tip_for};
use super::metrics::MetricsSink;
use super::model::{Difficulty, Job, MISSION_BRIEF, Message, MessageKind, Session, Step, senders};
use super::persister::DebouncedPersister;
use super::stage::{StageMachine, StageTransition, VerdictSource};
use super::store::PersistedSnapshot;

/// Shortest time a review appears to take, however fast the judge answers.
pub const MIN_REVIEW_TIME: Duration = Duration::from_millis(1500);

const HINT_NUDGE: &str = "💡 막히셨나요? `simulearn hint` 로 힌트를 확인해보세요!";

/// What a review produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewReport {
    pub verdict: Verdict,
    pub source: VerdictSource,
    pub transition: StageTransition,
    /// Set when this review crossed the hint threshold.
    pub hint: Option<HelpTip>,
    pub gauge: MoraleGauge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A review was already in flight.
    Ignored,
    /// Nothing to review: outside the task phase or every stage has passed.
    Skipped,
    /// The session was reset while the judge was deliberating.
    Discarded,
    Reviewed(ReviewReport),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InquiryOutcome {
    Ignored,
    Discarded,
    Asked {
        inquiry: Inquiry,
        source: VerdictSource,
    },
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn expect_step(session: &Session, expected: Step, operation: &'static str) -> Result<(), SessionError> {
    if session.step != expected {
        return Err(SessionError::WrongPhase {
            operation,
            expected,
            actual: session.step,
        });
    }
    Ok(())
}

pub struct SessionOrchestrator {
    session: Mutex<Session>,
    judge: Arc<dyn ReviewJudge>,
    persister: DebouncedPersister,
    metrics: Arc<dyn MetricsSink>,
    in_flight: AtomicBool,
    generation: AtomicU64,
    min_review_time: Duration,
}

impl SessionOrchestrator {
    /// Build an orchestrator, resuming the stored session if there is one.
    pub fn new(
        judge: Arc<dyn ReviewJudge>,
        persister: DebouncedPersister,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let session = match persister.store().load() {
            Some(session) => {
                tracing::info!(step = %session.step, stage = %session.review_stage, "resumed stored session");
                session
            }
            None => Session::default(),
        };

        Self {
            session: Mutex::new(session),
            judge,
            persister,
            metrics,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            min_review_time: MIN_REVIEW_TIME,
        }
    }

    pub fn with_min_review_time(mut self, min_review_time: Duration) -> Self {
        self.min_review_time = min_review_time;
        self
    }

    /// Copy of the current session.
    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }

    pub fn is_reviewing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn persist(&self, session: &Session) {
        self.persister.schedule(PersistedSnapshot::capture(session));
    }

    pub async fn select_job(&self, job: Job) -> Result<(), SessionError> {
        let mut session = self.session.lock().await;
        expect_step(&session, Step::JobSelection, "select a job")?;
        session.job = Some(job);
        session.step = Step::DifficultySelection;
        self.persist(&session);
        Ok(())
    }

    pub async fn select_difficulty(&self, difficulty: Difficulty) -> Result<(), SessionError> {
        let mut session = self.session.lock().await;
        expect_step(&session, Step::DifficultySelection, "choose a difficulty")?;
        session.difficulty = difficulty;
        session.step = Step::Intro;
        self.persist(&session);
        Ok(())
    }

    /// Hand out the mission brief and open the designer review.
    pub async fn begin_mission(&self) -> Result<(), SessionError> {
        {
            let mut session = self.session.lock().await;
            expect_step(&session, Step::Intro, "start the mission")?;
            session.push_message(Message::new(
                "mission",
                senders::BIZ_LEAD,
                MISSION_BRIEF,
                MessageKind::Mission,
            ));
            session.step = Step::Task;
            session.review_stage = Default::default();
            session.stage_attempts = 0;
            self.persist(&session);
            tracing::info!(difficulty = %session.difficulty, "mission started");
        }
        self.metrics.session_started().await;
        Ok(())
    }

    pub async fn edit_draft(&self, draft: impl Into<String>) {
        let mut session = self.session.lock().await;
        session.draft = draft.into();
        self.persist(&session);
    }

    /// Select the tip for the current position and remember it.
    pub async fn trigger_help(&self) -> HelpTip {
        let mut session = self.session.lock().await;
        let tip = tip_for(session.step, session.review_stage);
        session.help_tip = Some(tip);
        tip
    }

    pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("review already in flight; ignoring submit");
            return Ok(SubmitOutcome::Ignored);
        };
        let start = Instant::now();

        let (request, generation) = {
            let session = self.session.lock().await;
            if session.step != Step::Task || session.review_stage.is_terminal() {
                return Ok(SubmitOutcome::Skipped);
            }
            if session.draft.trim().is_empty() {
                return Err(SessionError::EmptyDraft);
            }
            let request = ReviewRequest {
                prd_content: session.draft.clone(),
                review_stage: session.review_stage,
                stage_attempts: session.stage_attempts,
                mission_difficulty: session.difficulty,
            };
            (request, self.generation.load(Ordering::Acquire))
        };

        tracing::info!(stage = %request.review_stage, attempts = request.stage_attempts, "requesting review");
        let (verdict, source) = match self.judge.request_verdict(&request).await {
            Ok(verdict) => (verdict, VerdictSource::Judge),
            Err(e) => {
                tracing::warn!(stage = %request.review_stage, error = %e, "judge unavailable, using fallback verdict");
                (fallback_verdict(request.review_stage), VerdictSource::Fallback)
            }
        };

        tokio::time::sleep_until(start + self.min_review_time).await;

        let report = {
            let mut session = self.session.lock().await;
            if self.generation.load(Ordering::Acquire) != generation {
                tracing::debug!("session reset during review; discarding verdict");
                return Ok(SubmitOutcome::Discarded);
            }

            session.push_message(Message::new(
                "feedback",
                &verdict.sender_id,
                verdict.message.clone(),
                MessageKind::Text,
            ));

            let mut machine = StageMachine::restore(session.review_stage, session.stage_attempts);
            let transition = machine.apply(verdict.passed, source);
            session.review_stage = machine.stage();
            session.stage_attempts = machine.attempts();

            let mut hint = None;
            match transition {
                StageTransition::Advanced { from, to } => {
                    tracing::info!(%from, %to, "review stage advanced");
                    if transition.completed() {
                        session.show_success = true;
                        session.gauge.restore();
                    }
                }
                StageTransition::Retained { hint_due, .. } => {
                    session.feedback_round += 1;
                    session.gauge.reduce(FAILURE_PENALTY);
                    if hint_due {
                        session.push_message(Message::new(
                            "hint-guide",
                            senders::SYSTEM,
                            HINT_NUDGE,
                            MessageKind::System,
                        ));
                        let tip = tip_for(session.step, session.review_stage);
                        session.help_tip = Some(tip);
                        hint = Some(tip);
                    }
                }
                StageTransition::Finished => {}
            }

            self.persist(&session);
            ReviewReport {
                verdict,
                source,
                transition,
                hint,
                gauge: session.gauge,
            }
        };

        if report.transition.completed() {
            self.metrics.session_completed().await;
        }
        Ok(SubmitOutcome::Reviewed(report))
    }

    /// Ask the developer persona for a follow-up question about the draft.
    pub async fn request_inquiry(&self) -> Result<InquiryOutcome, SessionError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return Ok(InquiryOutcome::Ignored);
        };

        let (request, generation) = {
            let session = self.session.lock().await;
            if !session.step.mission_started() {
                return Err(SessionError::MissionNotStarted);
            }
            let request = InquiryRequest {
                prd_content: session.draft.clone(),
                attempt: session.inquiry_count(),
            };
            (request, self.generation.load(Ordering::Acquire))
        };

        let (inquiry, source) = match self.judge.request_inquiry(&request).await {
            Ok(inquiry) => (inquiry, VerdictSource::Judge),
            Err(e) => {
                tracing::warn!(error = %e, "judge unavailable, using fallback question");
                (fallback_inquiry(), VerdictSource::Fallback)
            }
        };

        let mut session = self.session.lock().await;
        if self.generation.load(Ordering::Acquire) != generation {
            return Ok(InquiryOutcome::Discarded);
        }
        session.push_message(Message::new(
            "inquiry",
            &inquiry.sender_id,
            inquiry.message.clone(),
            MessageKind::Text,
        ));
        self.persist(&session);
        Ok(InquiryOutcome::Asked { inquiry, source })
    }

    /// Close the success notice and move on to the app preview.
    pub async fn dismiss_success(&self) -> Result<(), SessionError> {
        let mut session = self.session.lock().await;
        expect_step(&session, Step::Task, "continue to the app preview")?;
        if !session.review_stage.is_terminal() {
            return Err(SessionError::ReviewIncomplete);
        }
        session.show_success = false;
        session.step = Step::AppPreview;
        self.persist(&session);
        Ok(())
    }

    pub async fn finish(&self) -> Result<(), SessionError> {
        let mut session = self.session.lock().await;
        expect_step(&session, Step::AppPreview, "finish the simulation")?;
        session.step = Step::Completion;
        self.persist(&session);
        Ok(())
    }

    /// Return to a fresh session and forget the stored snapshot.
    pub async fn reset(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let mut session = self.session.lock().await;
        *session = Session::default();
        if let Err(e) = self.persister.discard() {
            tracing::warn!(error = %e, "failed to clear stored session");
        }
        tracing::info!("session reset");
    }

    /// Write any pending snapshot immediately.
    pub fn shutdown(&self) {
        if self.persister.flush() {
            tracing::debug!("flushed pending session snapshot");
        }
    }
}
