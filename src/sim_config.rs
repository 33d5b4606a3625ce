//! Configuration file for SimuLearn.
//!
//! Read from `.simulearn/simulearn.toml`. Every key is optional; a missing file
//! means all defaults. Values are layered file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [judge]
//! url = "http://127.0.0.1:3000"
//! attempt_timeout_ms = 15000
//! retry_delays_ms = [300, 800]
//!
//! [review]
//! min_review_time_ms = 1500
//!
//! [persistence]
//! storage_key = "simulearn_state"
//! debounce_ms = 500
//!
//! [service]
//! port = 3000
//! model = "claude-sonnet-4-20250514"
//! rate_limit_window_secs = 60
//! rate_limit_max_requests = 20
//!
//! [metrics]
//! remote = true
//! timeout_ms = 2000
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "simulearn.toml";
pub const JUDGE_URL_ENV: &str = "SIMULEARN_JUDGE_URL";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Where the review client sends drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeSection {
    #[serde(default = "default_judge_url")]
    pub url: String,
    /// Deadline for a single attempt
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Pause after each failed attempt; attempts = len + 1
    #[serde(default = "default_retry_delays_ms")]
    pub retry_delays_ms: Vec<u64>,
}

fn default_judge_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_attempt_timeout_ms() -> u64 {
    15_000
}

fn default_retry_delays_ms() -> Vec<u64> {
    vec![300, 800]
}

impl Default for JudgeSection {
    fn default() -> Self {
        Self {
            url: default_judge_url(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            retry_delays_ms: default_retry_delays_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSection {
    #[serde(default = "default_min_review_time_ms")]
    pub min_review_time_ms: u64,
}

fn default_min_review_time_ms() -> u64 {
    1_500
}

impl Default for ReviewSection {
    fn default() -> Self {
        Self {
            min_review_time_ms: default_min_review_time_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceSection {
    /// Snapshot key; also the file stem under `.simulearn/state/`
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_storage_key() -> String {
    crate::session::store::STORAGE_KEY.to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for PersistenceSection {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Settings for `simulearn serve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    crate::service::llm::DEFAULT_MODEL.to_string()
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_rate_limit_max_requests() -> u32 {
    20
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            model: default_model(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSection {
    /// Report session start/completion to the judge service
    #[serde(default = "default_remote_metrics")]
    pub remote: bool,
    #[serde(default = "default_metrics_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_remote_metrics() -> bool {
    true
}

fn default_metrics_timeout_ms() -> u64 {
    2_000
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            remote: default_remote_metrics(),
            timeout_ms: default_metrics_timeout_ms(),
        }
    }
}

/// Root of `simulearn.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimToml {
    #[serde(default)]
    pub judge: JudgeSection,
    #[serde(default)]
    pub review: ReviewSection,
    #[serde(default)]
    pub persistence: PersistenceSection,
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl SimToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse simulearn.toml")
    }

    /// Load `<sim_dir>/simulearn.toml`, or defaults if it does not exist.
    pub fn load_or_default(sim_dir: &Path) -> Result<Self> {
        let config_path = sim_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize simulearn.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Judge URL: environment, then file.
    pub fn judge_url(&self) -> String {
        self.judge_url_with(std::env::var(JUDGE_URL_ENV).ok())
    }

    fn judge_url_with(&self, env_value: Option<String>) -> String {
        env_value
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.judge.url.clone())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let url = &self.judge.url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(format!(
                "Invalid judge.url '{}': should start with http:// or https://",
                url
            ));
        }

        if self.judge.attempt_timeout_ms == 0 {
            warnings.push("judge.attempt_timeout_ms is 0: every attempt will time out".to_string());
        }

        if self.judge.retry_delays_ms.len() > 5 {
            warnings.push(format!(
                "judge.retry_delays_ms has {} entries: a failing judge will be retried {} times",
                self.judge.retry_delays_ms.len(),
                self.judge.retry_delays_ms.len()
            ));
        }

        let key = &self.persistence.storage_key;
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            warnings.push(format!(
                "Invalid persistence.storage_key '{}': use letters, digits, '_' or '-'",
                key
            ));
        }

        if self.service.rate_limit_max_requests == 0 {
            warnings.push(
                "service.rate_limit_max_requests is 0: every request will be rejected".to_string(),
            );
        }

        warnings
    }
}
