//! Simulation commands: job/difficulty selection, drafting, review and reset.

use anyhow::{Context, Result};
use console::style;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use simulearn::config::Config;
use simulearn::judge::{HttpJudge, RetryingJudge};
use simulearn::session::{
    DebouncedPersister, Difficulty, FileSnapshotStore, InquiryOutcome, Job, Message, MessageKind,
    MetricsSink, NoopMetrics, RemoteMetrics, ReviewReport, SessionOrchestrator, SessionStore,
    StageTransition, Step, SubmitOutcome, VerdictSource,
};
use simulearn::ui::icons::{CHECK, CROSS, SPARKLE, WARN};
use simulearn::ui::{self, ReviewSpinner};

/// Number of chat messages `status` prints by default.
pub const DEFAULT_TRANSCRIPT_LEN: usize = 6;

/// Wire an orchestrator from the project configuration.
pub fn build_orchestrator(config: &Config) -> Result<SessionOrchestrator> {
    config.ensure_directories()?;

    let backend = Arc::new(FileSnapshotStore::new(&config.state_dir));
    let store = SessionStore::new(backend, config.storage_key());
    let persister = DebouncedPersister::new(store, config.debounce());

    let judge_url = config.judge_url();
    let http = HttpJudge::new(&judge_url).context("Failed to create judge client")?;
    let judge = Arc::new(RetryingJudge::new(http, config.retry_policy()));

    let metrics: Arc<dyn MetricsSink> = if config.remote_metrics() {
        Arc::new(RemoteMetrics::new(&judge_url, config.metrics_timeout())?)
    } else {
        Arc::new(NoopMetrics)
    };

    tracing::debug!(%judge_url, key = config.storage_key(), "orchestrator ready");
    Ok(SessionOrchestrator::new(judge, persister, metrics).with_min_review_time(config.min_review_time()))
}

fn read_draft(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read draft file: {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read draft from stdin")?;
            Ok(buf)
        }
    }
}

fn next_step_hint(step: Step) -> &'static str {
    match step {
        Step::JobSelection => "Pick a role with 'simulearn job planner'.",
        Step::DifficultySelection => "Choose a difficulty with 'simulearn difficulty <easy|normal|hard>'.",
        Step::Intro => "Start the mission with 'simulearn start'.",
        Step::Task => "Write your draft with 'simulearn edit --file <path>' and run 'simulearn submit'.",
        Step::DevInquiry => "Answer the developer's question, or ask for another with 'simulearn inquire'.",
        Step::AppPreview => "Wrap up with 'simulearn finish'.",
        Step::Completion => "All done. Run 'simulearn reset' to play again.",
    }
}

pub async fn cmd_status(config: &Config, messages: usize) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let session = orchestrator.session().await;

    println!();
    println!("{}", ui::render_status(&session));

    if !session.messages.is_empty() && messages > 0 {
        println!();
        println!("{}", ui::render_transcript(&session.messages, messages, ui::wrap_width()));
    }

    println!();
    println!("{}", style(next_step_hint(session.step)).dim());
    println!();
    Ok(())
}

pub async fn cmd_job(config: &Config, job: &str) -> Result<()> {
    let job: Job = job.parse()?;
    let orchestrator = build_orchestrator(config)?;
    orchestrator.select_job(job).await?;
    orchestrator.shutdown();

    println!("{}Job selected: {}", CHECK, job);
    if job != Job::Planner {
        println!(
            "{}",
            style("Only the planner track has a mission for now; you will play the planner role.").dim()
        );
    }
    Ok(())
}

pub async fn cmd_difficulty(config: &Config, difficulty: &str) -> Result<()> {
    let difficulty: Difficulty = difficulty.parse()?;
    let orchestrator = build_orchestrator(config)?;
    orchestrator.select_difficulty(difficulty).await?;
    orchestrator.shutdown();

    println!("{}Difficulty: {} ({})", CHECK, difficulty, difficulty.label());
    Ok(())
}

pub async fn cmd_start(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    orchestrator.begin_mission().await?;
    orchestrator.shutdown();

    let session = orchestrator.session().await;
    if let Some(mission) = session.messages.last() {
        println!();
        println!("{}", ui::render_message(mission, ui::wrap_width()));
        println!();
    }
    println!("{}", style(next_step_hint(session.step)).dim());
    Ok(())
}

/// Replace the draft, or print it when `show` is set.
pub async fn cmd_edit(config: &Config, file: Option<&Path>, show: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    if show {
        println!("{}", orchestrator.session().await.draft);
        return Ok(());
    }

    let draft = read_draft(file)?;
    let chars = draft.chars().count();
    orchestrator.edit_draft(draft).await;
    orchestrator.shutdown();

    println!("{}Draft saved ({} chars)", CHECK, chars);
    Ok(())
}

fn print_report(report: &ReviewReport) {
    let width = ui::wrap_width();
    let verdict = if report.verdict.passed {
        format!("{}{}", CHECK, style("PASS").green().bold())
    } else {
        format!("{}{}", CROSS, style("FAIL").red().bold())
    };

    println!();
    println!("{}", verdict);
    let message = Message::new(
        "feedback",
        &report.verdict.sender_id,
        report.verdict.message.clone(),
        MessageKind::Text,
    );
    println!("{}", ui::render_message(&message, width));

    if report.source == VerdictSource::Fallback {
        println!(
            "{}{}",
            WARN,
            style("The reviewer could not be reached. Please submit again.").yellow()
        );
    }

    match report.transition {
        StageTransition::Advanced { to, .. } if to.is_terminal() => {}
        StageTransition::Advanced { to, .. } => {
            println!();
            println!("Next reviewer: {}", style(to).cyan());
        }
        _ => {}
    }

    if report.transition.completed() {
        println!();
        println!(
            "{}{}",
            SPARKLE,
            style("All reviews passed! Run 'simulearn continue' to see the app preview.").green().bold()
        );
    }

    if let Some(tip) = &report.hint {
        println!();
        println!("{}", ui::render_tip(tip, width));
    }

    println!();
    println!("{}", ui::render_gauge(report.gauge));
}

pub async fn cmd_submit(config: &Config, file: Option<&Path>) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    if let Some(path) = file {
        orchestrator.edit_draft(read_draft(Some(path))?).await;
    }

    let session = orchestrator.session().await;
    let spinner = (session.step == Step::Task && !session.review_stage.is_terminal())
        .then(|| ReviewSpinner::for_stage(session.review_stage));

    let outcome = orchestrator.submit().await;
    orchestrator.shutdown();

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(spinner) = spinner {
                spinner.fail("Submission rejected");
            }
            return Err(e.into());
        }
    };

    match outcome {
        SubmitOutcome::Reviewed(report) => {
            if let Some(spinner) = spinner {
                spinner.clear();
            }
            print_report(&report);
        }
        SubmitOutcome::Skipped => {
            if let Some(spinner) = spinner {
                spinner.clear();
            }
            println!("Nothing to review right now.");
            println!("{}", style(next_step_hint(session.step)).dim());
        }
        SubmitOutcome::Ignored | SubmitOutcome::Discarded => {
            if let Some(spinner) = spinner {
                spinner.clear();
            }
            println!("Review was interrupted; submit again.");
        }
    }
    Ok(())
}

pub async fn cmd_hint(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let tip = orchestrator.trigger_help().await;

    println!();
    println!("{}", ui::render_tip(&tip, ui::wrap_width()));
    println!();
    Ok(())
}

pub async fn cmd_inquire(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let spinner = ReviewSpinner::start("개발자가 질문을 준비하고 있어요...");

    let outcome = orchestrator.request_inquiry().await;
    orchestrator.shutdown();
    spinner.clear();

    match outcome? {
        InquiryOutcome::Asked { inquiry, source } => {
            let message = Message::new(
                "inquiry",
                &inquiry.sender_id,
                inquiry.message,
                MessageKind::Text,
            );
            println!();
            println!("{}", ui::render_message(&message, ui::wrap_width()));
            if source == VerdictSource::Fallback {
                println!("{}{}", WARN, style("The developer could not be reached.").yellow());
            }
            println!();
        }
        InquiryOutcome::Ignored | InquiryOutcome::Discarded => {
            println!("Inquiry was interrupted; try again.");
        }
    }
    Ok(())
}

pub async fn cmd_continue(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    orchestrator.dismiss_success().await?;
    orchestrator.shutdown();

    println!("{}Your PRD shipped! The team built the app from your plan.", SPARKLE);
    println!("{}", style(next_step_hint(Step::AppPreview)).dim());
    Ok(())
}

pub async fn cmd_finish(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    orchestrator.finish().await?;
    orchestrator.shutdown();

    let session = orchestrator.session().await;
    println!("{}Simulation complete!", CHECK);
    println!("{}", ui::render_gauge(session.gauge));
    Ok(())
}

pub async fn cmd_reset(config: &Config, force: bool) -> Result<()> {
    use dialoguer::Confirm;

    if !force {
        let confirm = Confirm::new()
            .with_prompt("This will reset all progress. Are you sure?")
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    let orchestrator = build_orchestrator(config)?;
    orchestrator.reset().await;

    println!("Reset complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_step_has_a_hint() {
        for step in [
            Step::JobSelection,
            Step::DifficultySelection,
            Step::Intro,
            Step::Task,
            Step::DevInquiry,
            Step::AppPreview,
            Step::Completion,
        ] {
            assert!(next_step_hint(step).contains("simulearn"));
        }
    }
}
