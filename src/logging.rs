//! Tracing setup for the CLI and the judge service.
//!
//! Human-readable output goes to stderr so it never mixes with command output.
//! `serve` can additionally write a daily-rotated file under `.simulearn/logs`.

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_PREFIX: &str = "simulearn.log";

/// Default filter directive when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "simulearn=debug,info" } else { "warn" }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber.
///
/// The returned guard must be held for the life of the process when a log
/// directory was given; dropping it flushes the file writer.
pub fn init_logging(verbose: bool, json: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let (stderr_json, stderr_text) = if json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (
            None,
            Some(fmt::layer().with_target(verbose).with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(stderr_json)
        .with(stderr_text)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "warn");
        assert!(default_directive(true).contains("simulearn=debug"));
    }

    #[test]
    fn test_directives_parse() {
        assert!(EnvFilter::try_new(default_directive(true)).is_ok());
        assert!(EnvFilter::try_new(default_directive(false)).is_ok());
    }
}
