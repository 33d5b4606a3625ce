use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use simulearn::config::Config;
use simulearn::logging;

mod cmd;

#[derive(Parser)]
#[command(name = "simulearn")]
#[command(version, about = "PRD review simulation: get your plan past the design, dev and QA leads")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show where the simulation is and the latest chat messages
    Status {
        /// Number of chat messages to show
        #[arg(short = 'n', long, default_value_t = cmd::session::DEFAULT_TRANSCRIPT_LEN)]
        messages: usize,
    },
    /// Pick a role: planner, marketer or designer
    Job { job: String },
    /// Choose the mission difficulty: easy, normal or hard
    Difficulty { difficulty: String },
    /// Receive the mission brief and open the review
    Start,
    /// Replace the PRD draft (reads stdin when no file is given)
    Edit {
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Print the current draft instead of replacing it
        #[arg(long, conflicts_with = "file")]
        show: bool,
    },
    /// Send the draft to the current reviewer
    Submit {
        /// Replace the draft with this file before submitting
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Show a tip for the current review stage
    Hint,
    /// Ask the developer lead for a follow-up question about the draft
    Inquire,
    /// Close the success notice and open the app preview
    Continue,
    /// Finish the simulation
    Finish,
    /// Discard all progress and start over
    Reset {
        #[arg(long)]
        force: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Run the judge service
    Serve {
        /// Port to serve on (defaults to [service].port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (permissive CORS, bind all interfaces)
        #[arg(long)]
        dev: bool,

        /// Emit logs as JSON on stderr
        #[arg(long)]
        log_json: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default simulearn.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = Config::new(project_dir, cli.verbose)?;

    let _log_guard = match &cli.command {
        Commands::Serve { log_json, .. } => {
            logging::init_logging(cli.verbose, *log_json, Some(&config.log_dir))?
        }
        _ => logging::init_logging(cli.verbose, false, None)?,
    };

    match &cli.command {
        Commands::Status { messages } => cmd::cmd_status(&config, *messages).await?,
        Commands::Job { job } => cmd::cmd_job(&config, job).await?,
        Commands::Difficulty { difficulty } => cmd::cmd_difficulty(&config, difficulty).await?,
        Commands::Start => cmd::cmd_start(&config).await?,
        Commands::Edit { file, show } => cmd::cmd_edit(&config, file.as_deref(), *show).await?,
        Commands::Submit { file } => cmd::cmd_submit(&config, file.as_deref()).await?,
        Commands::Hint => cmd::cmd_hint(&config).await?,
        Commands::Inquire => cmd::cmd_inquire(&config).await?,
        Commands::Continue => cmd::cmd_continue(&config).await?,
        Commands::Finish => cmd::cmd_finish(&config).await?,
        Commands::Reset { force } => cmd::cmd_reset(&config, *force).await?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
        Commands::Serve { port, dev, .. } => cmd::cmd_serve(&config, *port, *dev).await?,
    }

    Ok(())
}
