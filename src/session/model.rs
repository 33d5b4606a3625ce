//! Core session types: lifecycle steps, chat messages, personas and the
//! session record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::gauge::MoraleGauge;
use super::hints::HelpTip;
use super::stage::ReviewStage;

/// Draft every new session starts from.
pub const DEFAULT_DRAFT: &str = "# 두쫀쿠 소진 시점 판매 임박 매장 강조\n\n## 목표\n\n## 상세 정책\n\n";

/// Mission brief posted by the business lead when the task begins.
pub const MISSION_BRIEF: &str = "두쫀쿠가 다 떨어지는 시점에 판매 임박 매장을 더 강조하는 기능을 개발하려고 합니다. 기획안을 작성해주세요.";

/// Fixed sender identifiers used in the message log.
pub mod senders {
    pub const USER: &str = "user";
    pub const SYSTEM: &str = "system";
    pub const DESIGNER: &str = "designer-lead";
    pub const DEVELOPER: &str = "dev-senior";
    pub const QA: &str = "qa-manager";
    pub const BIZ_LEAD: &str = "biz-lead";
}

/// A team member the planner works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Persona {
    pub id: &'static str,
    pub role: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub style: &'static str,
}

pub const TEAM_PERSONAS: &[Persona] = &[
    Persona {
        id: senders::DESIGNER,
        role: "디자이너",
        name: "이사라",
        description: "UX/UI 전문가",
        style: "시각적 & 사용자 중심",
    },
    Persona {
        id: senders::DEVELOPER,
        role: "개발자",
        name: "강개발",
        description: "테크 리드",
        style: "논리적 & 비판적",
    },
    Persona {
        id: senders::QA,
        role: "QA 매니저",
        name: "김꼼꼼",
        description: "품질 관리자",
        style: "예외 케이스 & 시나리오",
    },
    Persona {
        id: senders::BIZ_LEAD,
        role: "사업 리더",
        name: "최이사",
        description: "프로젝트 오너",
        style: "목표 지향적",
    },
];

/// Look up a team persona by sender id.
pub fn persona(sender_id: &str) -> Option<&'static Persona> {
    TEAM_PERSONAS.iter().find(|p| p.id == sender_id)
}

/// Top-level lifecycle step of the simulation, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    #[default]
    #[serde(rename = "job-selection")]
    JobSelection,
    #[serde(rename = "difficulty-selection")]
    DifficultySelection,
    #[serde(rename = "intro")]
    Intro,
    #[serde(rename = "level-1-task")]
    Task,
    #[serde(rename = "level-2-dev-inquiry")]
    DevInquiry,
    #[serde(rename = "app-preview")]
    AppPreview,
    #[serde(rename = "completion")]
    Completion,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::JobSelection => "job-selection",
            Step::DifficultySelection => "difficulty-selection",
            Step::Intro => "intro",
            Step::Task => "level-1-task",
            Step::DevInquiry => "level-2-dev-inquiry",
            Step::AppPreview => "app-preview",
            Step::Completion => "completion",
        }
    }

    /// Whether the mission brief has been handed out.
    pub fn mission_started(&self) -> bool {
        *self >= Step::Task
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role the user picks at the start. Only the planner track has a mission today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Job {
    Planner,
    Marketer,
    Designer,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Planner => write!(f, "planner"),
            Job::Marketer => write!(f, "marketer"),
            Job::Designer => write!(f, "designer"),
        }
    }
}

impl FromStr for Job {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planner" => Ok(Job::Planner),
            "marketer" => Ok(Job::Marketer),
            "designer" => Ok(Job::Designer),
            _ => anyhow::bail!(
                "Invalid job '{}'. Valid values: planner, marketer, designer",
                s
            ),
        }
    }
}

/// Mission difficulty. Forwarded to the judge as a leniency hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "쉬움",
            Difficulty::Normal => "보통",
            Difficulty::Hard => "어려움",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Normal => write!(f, "normal"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            _ => anyhow::bail!(
                "Invalid difficulty '{}'. Valid values: easy, normal, hard",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    System,
    Mission,
}

/// One entry in the chat log. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

impl Message {
    /// Create a message with a fresh id of the form `{prefix}-{uuid}`.
    pub fn new(prefix: &str, sender_id: &str, text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id: format!("{}-{}", prefix, Uuid::new_v4()),
            sender_id: sender_id.to_string(),
            text: text.into(),
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn is_from_team(&self) -> bool {
        self.sender_id != senders::USER && self.sender_id != senders::SYSTEM
    }
}

/// Complete state of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub step: Step,
    pub review_stage: ReviewStage,
    pub stage_attempts: u32,
    pub job: Option<Job>,
    pub difficulty: Difficulty,
    pub gauge: MoraleGauge,
    pub draft: String,
    pub messages: Vec<Message>,
    /// Number of failed review rounds across all stages. Not persisted.
    pub feedback_round: u32,
    /// Set when QA approves; cleared by `dismiss_success`. Not persisted.
    pub show_success: bool,
    /// Last tip surfaced to the user. Not persisted.
    pub help_tip: Option<HelpTip>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            step: Step::default(),
            review_stage: ReviewStage::default(),
            stage_attempts: 0,
            job: None,
            difficulty: Difficulty::default(),
            gauge: MoraleGauge::default(),
            draft: DEFAULT_DRAFT.to_string(),
            messages: Vec::new(),
            feedback_round: 0,
            show_success: false,
            help_tip: None,
        }
    }
}

impl Session {
    pub fn push_message(&mut self, message: Message) {
        if message.is_from_team() {
            if let Some(sender) = persona(&message.sender_id) {
                tracing::debug!(sender = sender.role, "feedback message arrived");
            }
        }
        self.messages.push(message);
    }

    /// Number of developer follow-up questions asked so far.
    pub fn inquiry_count(&self) -> u32 {
        self.messages
            .iter()
            .filter(|m| m.id.starts_with("inquiry-"))
            .count() as u32
    }
}
