//! Judge service command: `simulearn serve`.

use anyhow::Result;
use std::sync::Arc;

use simulearn::config::Config;
use simulearn::service::{self, AnthropicBackend};

pub async fn cmd_serve(config: &Config, port: Option<u16>, dev: bool) -> Result<()> {
    let warnings = config.validate();
    for warning in &warnings {
        tracing::warn!(%warning, "configuration warning");
    }

    let api_key = config.api_key()?;
    let llm = Arc::new(AnthropicBackend::new(api_key, config.model()));
    let server_config = config.server_config(port, dev);

    tracing::info!(
        port = server_config.port,
        model = config.model(),
        rate_limit = server_config.rate_limit_max,
        "starting judge service"
    );

    service::start_server(server_config, llm).await
}
