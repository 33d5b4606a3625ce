//! Configuration view and validation commands: `simulearn config`.

use anyhow::Result;

use simulearn::config::Config;
use simulearn::sim_config::{JUDGE_URL_ENV, SimToml};

use super::super::ConfigCommands;

fn print_toml(toml: &SimToml) {
    println!("[judge]");
    println!("  url = \"{}\"", toml.judge.url);
    println!("  attempt_timeout_ms = {}", toml.judge.attempt_timeout_ms);
    println!("  retry_delays_ms = {:?}", toml.judge.retry_delays_ms);
    println!();
    println!("[review]");
    println!("  min_review_time_ms = {}", toml.review.min_review_time_ms);
    println!();
    println!("[persistence]");
    println!("  storage_key = \"{}\"", toml.persistence.storage_key);
    println!("  debounce_ms = {}", toml.persistence.debounce_ms);
    println!();
    println!("[service]");
    println!("  port = {}", toml.service.port);
    println!("  model = \"{}\"", toml.service.model);
    println!("  rate_limit_window_secs = {}", toml.service.rate_limit_window_secs);
    println!("  rate_limit_max_requests = {}", toml.service.rate_limit_max_requests);
    println!();
    println!("[metrics]");
    println!("  remote = {}", toml.metrics.remote);
    println!("  timeout_ms = {}", toml.metrics.timeout_ms);
    println!();
}

pub fn cmd_config(config: &Config, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = &config.config_file;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("SimuLearn Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No simulearn.toml found at {}", config_path.display());
                println!("Using default configuration:");
            }
            println!();
            print_toml(config.toml());

            println!("Effective values (with env overrides):");
            println!("  judge url = \"{}\"", config.judge_url());
            if std::env::var(JUDGE_URL_ENV).is_ok() {
                println!("  ({} is set)", JUDGE_URL_ENV);
            }
            println!("  state dir = {}", config.state_dir.display());
            println!();

            if !config_path.exists() {
                println!("Run 'simulearn config init' to create a simulearn.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No simulearn.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("simulearn.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config.sim_dir.exists() {
                std::fs::create_dir_all(&config.sim_dir)?;
            }

            SimToml::default().save(config_path)?;

            println!("Created simulearn.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [judge] url, attempt_timeout_ms, retry_delays_ms");
            println!("  - [persistence] storage_key, debounce_ms");
            println!("  - [service] port, model, rate limits");
            println!();
        }
    }

    Ok(())
}
