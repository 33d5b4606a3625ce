//! Simulation session: state, rules and persistence.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`model`] | Lifecycle steps, messages, personas, the session record |
//! | [`stage`] | Review stage state machine |
//! | [`gauge`] | Morale gauge |
//! | [`hints`] | Help tip selection |
//! | [`store`] | Versioned snapshot storage |
//! | [`persister`] | Debounced snapshot writes |
//! | [`metrics`] | Session lifecycle and request counters |
//! | [`orchestrator`] | Wires the above behind the user-facing operations |

pub mod gauge;
pub mod hints;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod persister;
pub mod stage;
pub mod store;

pub use gauge::MoraleGauge;
pub use hints::{HelpTip, tip_for};
pub use metrics::{ApiEndpoint, MetricsSink, NoopMetrics, RemoteMetrics, StatsReport, UsageStats};
pub use model::{Difficulty, Job, Message, MessageKind, Session, Step};
pub use orchestrator::{InquiryOutcome, ReviewReport, SessionOrchestrator, SubmitOutcome};
pub use persister::DebouncedPersister;
pub use stage::{ReviewStage, StageMachine, StageTransition, VerdictSource};
pub use store::{FileSnapshotStore, MemorySnapshotStore, PersistedSnapshot, SessionStore, SnapshotStore};
