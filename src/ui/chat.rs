//! Terminal rendering of the team chat, the morale gauge and help tips.
//!
//! Rendering functions return `String`s so the commands decide where output
//! goes and tests can inspect it with styling disabled.

use console::style;

use crate::session::model::{Persona, persona, senders};
use crate::session::{HelpTip, Message, MessageKind, MoraleGauge, ReviewStage, Session, Step};
use crate::session::gauge::GAUGE_MAX;
use crate::ui::icons::{HEART, HINT, MISSION, SPEECH, SYSTEM, USER, WARN};

const GAUGE_WIDTH: usize = 20;
const MIN_WRAP: usize = 40;
const MAX_WRAP: usize = 100;

/// Wrap width for chat bodies, from the terminal size when known.
pub fn wrap_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| (w.0 as usize).saturating_sub(4))
        .unwrap_or(80)
        .clamp(MIN_WRAP, MAX_WRAP)
}

fn speaker(message: &Message) -> String {
    match message.sender_id.as_str() {
        senders::USER => format!("{}{}", USER, style("나").bold()),
        senders::SYSTEM => format!("{}{}", SYSTEM, style("시스템").dim()),
        id => match persona(id) {
            Some(Persona { role, name, .. }) => {
                format!("{}{} {}", SPEECH, style(name).cyan().bold(), style(format!("({})", role)).dim())
            }
            None => format!("{}{}", SPEECH, id),
        },
    }
}

/// Render one chat message as a header line plus an indented, wrapped body.
pub fn render_message(message: &Message, width: usize) -> String {
    let header = match message.kind {
        MessageKind::Mission => format!("{}{}", MISSION, style("미션").yellow().bold()),
        _ => speaker(message),
    };
    let time = message.timestamp.format("%H:%M");

    let options = textwrap::Options::new(width)
        .initial_indent("  ")
        .subsequent_indent("  ");
    let body = textwrap::fill(&message.text, options);

    let body = match message.kind {
        MessageKind::System => style(body).dim().to_string(),
        _ => body,
    };

    format!("{} {}\n{}", header, style(time).dim(), body)
}

/// Render the last `limit` messages, oldest first.
pub fn render_transcript(messages: &[Message], limit: usize, width: usize) -> String {
    let start = messages.len().saturating_sub(limit);
    messages[start..]
        .iter()
        .map(|m| render_message(m, width))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `[████████░░░░] 70/100`, red when morale is low.
pub fn render_gauge(gauge: MoraleGauge) -> String {
    let value = gauge.value().min(GAUGE_MAX);
    let filled = (value as usize * GAUGE_WIDTH) / GAUGE_MAX as usize;
    let bar = format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(GAUGE_WIDTH - filled)
    );
    let bar = if gauge.is_low() {
        style(bar).red().to_string()
    } else {
        style(bar).green().to_string()
    };

    let mut line = format!("{}팀 사기 [{}] {}/{}", HEART, bar, value, GAUGE_MAX);
    if gauge.is_low() {
        line.push_str(&format!(
            "\n{}{}",
            WARN,
            style("팀의 사기가 떨어지고 있어요. 힌트를 참고해보세요.").red()
        ));
    }
    line
}

pub fn render_tip(tip: &HelpTip, width: usize) -> String {
    let options = textwrap::Options::new(width)
        .initial_indent("  ")
        .subsequent_indent("  ");
    format!(
        "{}{}\n{}\n\n{}",
        HINT,
        style(tip.title).yellow().bold(),
        textwrap::fill(tip.concept, options.clone()),
        textwrap::fill(tip.guide, options)
    )
}

fn stage_progress(stage: ReviewStage) -> String {
    [ReviewStage::Designer, ReviewStage::Developer, ReviewStage::Qa]
        .iter()
        .map(|s| {
            let label = persona(s.sender_id()).map(|p| p.role).unwrap_or_default();
            if *s < stage {
                style(format!("✓ {}", label)).green().to_string()
            } else if *s == stage {
                style(format!("▶ {}", label)).cyan().bold().to_string()
            } else {
                style(format!("· {}", label)).dim().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// One-screen summary of where the session is.
pub fn render_status(session: &Session) -> String {
    let mut lines = vec![format!("Step: {}", style(session.step).bold())];

    if let Some(job) = session.job {
        lines.push(format!("Job: {}", job));
    }
    lines.push(format!(
        "Difficulty: {} ({})",
        session.difficulty,
        session.difficulty.label()
    ));

    if session.step.mission_started() {
        lines.push(format!("Review: {}", stage_progress(session.review_stage)));
        if !session.review_stage.is_terminal() {
            lines.push(format!("Attempts in stage: {}", session.stage_attempts));
        }
        lines.push(render_gauge(session.gauge));
    }

    if session.step == Step::Task && session.review_stage.is_terminal() {
        lines.push(format!(
            "{}",
            style("모든 리뷰를 통과했어요! `simulearn continue` 로 결과를 확인하세요.").green()
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        console::set_colors_enabled(false);
    }

    #[test]
    fn test_render_message_uses_persona_name_and_role() {
        plain();
        let message = Message::new("feedback", senders::DEVELOPER, "예외 처리가 빠졌어요.", MessageKind::Text);
        let rendered = render_message(&message, 60);
        assert!(rendered.contains("강개발"));
        assert!(rendered.contains("(개발자)"));
        assert!(rendered.contains("  예외 처리가 빠졌어요."));
    }

    #[test]
    fn test_render_message_wraps_body() {
        plain();
        let text = "word ".repeat(30);
        let message = Message::new("user", senders::USER, text, MessageKind::Text);
        let rendered = render_message(&message, 40);
        for line in rendered.lines().skip(1) {
            assert!(line.chars().count() <= 40, "line too long: {:?}", line);
        }
    }

    #[test]
    fn test_render_transcript_keeps_latest() {
        plain();
        let messages: Vec<Message> = (0..5)
            .map(|i| Message::new("user", senders::USER, format!("msg {}", i), MessageKind::Text))
            .collect();
        let rendered = render_transcript(&messages, 2, 60);
        assert!(!rendered.contains("msg 2"));
        assert!(rendered.contains("msg 3"));
        assert!(rendered.contains("msg 4"));
    }

    #[test]
    fn test_render_gauge_bar() {
        plain();
        let full = render_gauge(MoraleGauge::default());
        assert!(full.contains("100/100"));
        assert!(full.contains(&"█".repeat(GAUGE_WIDTH)));
        assert!(!full.contains("사기가 떨어지고"));

        let low = render_gauge(MoraleGauge::from(20));
        assert!(low.contains("20/100"));
        assert!(low.contains("사기가 떨어지고"));
    }

    #[test]
    fn test_render_tip() {
        plain();
        let tip = crate::session::tip_for(Step::Task, ReviewStage::Developer);
        let rendered = render_tip(&tip, 80);
        assert!(rendered.contains(tip.title));
        assert!(rendered.contains("Happy Path"));
    }

    #[test]
    fn test_render_status_before_mission() {
        plain();
        let session = Session::default();
        let rendered = render_status(&session);
        assert!(rendered.contains("Step:"));
        assert!(!rendered.contains("Review:"));
    }

    #[test]
    fn test_render_status_during_task() {
        plain();
        let session = Session {
            step: Step::Task,
            review_stage: ReviewStage::Developer,
            stage_attempts: 1,
            ..Session::default()
        };
        let rendered = render_status(&session);
        assert!(rendered.contains("✓ 디자이너"));
        assert!(rendered.contains("▶ 개발자"));
        assert!(rendered.contains("Attempts in stage: 1"));
    }

    #[test]
    fn test_wrap_width_is_clamped() {
        let width = wrap_width();
        assert!((MIN_WRAP..=MAX_WRAP).contains(&width));
    }
}
