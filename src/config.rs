use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::judge::RetryPolicy;
use crate::service::ServerConfig;
use crate::sim_config::{API_KEY_ENV, CONFIG_FILE_NAME, SimToml};

/// Runtime configuration for SimuLearn.
///
/// Resolves the `.simulearn` directory layout for a project and exposes the
/// parsed `simulearn.toml` as the typed values the commands need.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub sim_dir: PathBuf,
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
    pub config_file: PathBuf,
    pub verbose: bool,
    toml: SimToml,
}

impl Config {
    pub fn new(project_dir: PathBuf, verbose: bool) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;

        let sim_dir = project_dir.join(".simulearn");
        let toml = SimToml::load_or_default(&sim_dir)?;

        Ok(Self {
            state_dir: sim_dir.join("state"),
            log_dir: sim_dir.join("logs"),
            config_file: sim_dir.join(CONFIG_FILE_NAME),
            project_dir,
            sim_dir,
            verbose,
            toml,
        })
    }

    pub fn toml(&self) -> &SimToml {
        &self.toml
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir).context("Failed to create state directory")?;
        std::fs::create_dir_all(&self.log_dir).context("Failed to create log directory")?;
        Ok(())
    }

    pub fn judge_url(&self) -> String {
        self.toml.judge_url()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: Duration::from_millis(self.toml.judge.attempt_timeout_ms),
            delays: self
                .toml
                .judge
                .retry_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.toml.persistence.storage_key
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.toml.persistence.debounce_ms)
    }

    pub fn min_review_time(&self) -> Duration {
        Duration::from_millis(self.toml.review.min_review_time_ms)
    }

    pub fn remote_metrics(&self) -> bool {
        self.toml.metrics.remote
    }

    pub fn metrics_timeout(&self) -> Duration {
        Duration::from_millis(self.toml.metrics.timeout_ms)
    }

    /// Server settings, with CLI overrides applied.
    pub fn server_config(&self, port: Option<u16>, dev_mode: bool) -> ServerConfig {
        ServerConfig {
            port: port.unwrap_or(self.toml.service.port),
            dev_mode,
            rate_limit_window: Duration::from_secs(self.toml.service.rate_limit_window_secs),
            rate_limit_max: self.toml.service.rate_limit_max_requests,
        }
    }

    pub fn model(&self) -> &str {
        &self.toml.service.model
    }

    /// API key for the language model, from the environment only.
    pub fn api_key(&self) -> Result<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| format!("{} is not set. Add it to your environment or .env file", API_KEY_ENV))
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
