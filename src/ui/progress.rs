use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::session::ReviewStage;
use crate::ui::icons::{CHECK, CROSS, REVIEW};

/// Spinner shown while a review or inquiry is in flight.
///
/// Hidden when stderr is not a terminal so scripted runs get clean output.
pub struct ReviewSpinner {
    bar: ProgressBar,
}

impl ReviewSpinner {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(spinner_style);
        }
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Spinner for a draft under review by `stage`.
    pub fn for_stage(stage: ReviewStage) -> Self {
        Self::start(format!(
            "{}{} 님이 기획서를 검토하고 있어요...",
            REVIEW,
            reviewer_label(stage)
        ))
    }

    pub fn succeed(self, msg: &str) {
        self.bar
            .finish_with_message(format!("{}{}", CHECK, style(msg).green()));
    }

    pub fn fail(self, msg: &str) {
        self.bar
            .finish_with_message(format!("{}{}", CROSS, style(msg).red()));
    }

    pub fn clear(self) {
        self.bar.finish_and_clear();
    }
}

fn reviewer_label(stage: ReviewStage) -> String {
    crate::session::model::persona(stage.sender_id())
        .map(|p| format!("{} {}", p.role, p.name))
        .unwrap_or_else(|| "팀".to_string())
}
