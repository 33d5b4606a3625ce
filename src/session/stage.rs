//! Review stage state machine.
//!
//! The draft must pass three reviewers in order:
//!
//! ```text
//! designer ──pass──▶ developer ──pass──▶ qa ──pass──▶ done
//!    │ fail/fallback      │ fail/fallback    │ fail/fallback
//!    └──▶ same stage, attempts + 1 ...
//! ```
//!
//! Only a passing verdict that actually came from the judge advances the
//! stage. A fallback verdict (judge unreachable) repeats the stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::model::senders;

/// Number of failed attempts in one stage after which a hint is surfaced.
pub const HINT_THRESHOLD: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStage {
    #[default]
    Designer,
    Developer,
    Qa,
    Done,
}

impl ReviewStage {
    /// The stage that follows this one. `Done` is absorbing.
    pub fn next(self) -> Self {
        match self {
            ReviewStage::Designer => ReviewStage::Developer,
            ReviewStage::Developer => ReviewStage::Qa,
            ReviewStage::Qa | ReviewStage::Done => ReviewStage::Done,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ReviewStage::Done
    }

    /// Canonical sender id of the reviewer for this stage.
    pub fn sender_id(self) -> &'static str {
        match self {
            ReviewStage::Designer => senders::DESIGNER,
            ReviewStage::Developer => senders::DEVELOPER,
            ReviewStage::Qa => senders::QA,
            ReviewStage::Done => "",
        }
    }

    /// Apology shown when the judge could not be reached for this stage.
    pub fn fallback_message(self) -> &'static str {
        match self {
            ReviewStage::Designer => "일시적인 오류가 발생했어요. 기획안을 다시 제출해주세요.",
            ReviewStage::Developer => "네트워크 문제가 있는 것 같아요. 잠시 후 다시 시도해주세요.",
            ReviewStage::Qa => "검토 중 문제가 발생했습니다. 다시 제출해주세요.",
            ReviewStage::Done => "",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStage::Designer => "designer",
            ReviewStage::Developer => "developer",
            ReviewStage::Qa => "qa",
            ReviewStage::Done => "done",
        }
    }
}

impl fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "designer" => Ok(ReviewStage::Designer),
            "developer" => Ok(ReviewStage::Developer),
            "qa" => Ok(ReviewStage::Qa),
            "done" => Ok(ReviewStage::Done),
            _ => anyhow::bail!(
                "Invalid review stage '{}'. Valid values: designer, developer, qa, done",
                s
            ),
        }
    }
}

/// Where a verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictSource {
    /// The remote judge answered.
    Judge,
    /// The judge was unreachable; the verdict was synthesized locally.
    Fallback,
}

/// Result of feeding one verdict into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageTransition {
    /// The stage moved forward and attempts were reset.
    Advanced { from: ReviewStage, to: ReviewStage },
    /// The stage repeats. `hint_due` is set on the attempt that crosses the threshold.
    Retained {
        stage: ReviewStage,
        attempts: u32,
        hint_due: bool,
    },
    /// The machine is already in `Done`; nothing changed.
    Finished,
}

impl StageTransition {
    /// True when this transition moved the session from `qa` into `done`.
    pub fn completed(&self) -> bool {
        matches!(
            self,
            StageTransition::Advanced {
                to: ReviewStage::Done,
                ..
            }
        )
    }

    pub fn advanced(&self) -> bool {
        matches!(self, StageTransition::Advanced { .. })
    }
}

/// Current stage plus the attempts spent in it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageMachine {
    stage: ReviewStage,
    attempts: u32,
}

impl StageMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a machine from persisted values.
    pub fn restore(stage: ReviewStage, attempts: u32) -> Self {
        Self { stage, attempts }
    }

    pub fn stage(&self) -> ReviewStage {
        self.stage
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Apply a verdict for the current stage.
    pub fn apply(&mut self, passed: bool, source: VerdictSource) -> StageTransition {
        if self.stage.is_terminal() {
            return StageTransition::Finished;
        }

        if passed && source == VerdictSource::Judge {
            let from = self.stage;
            self.stage = from.next();
            self.attempts = 0;
            return StageTransition::Advanced {
                from,
                to: self.stage,
            };
        }

        self.attempts += 1;
        StageTransition::Retained {
            stage: self.stage,
            attempts: self.attempts,
            hint_due: self.attempts == HINT_THRESHOLD,
        }
    }
}
