//! Judge service: the HTTP endpoint the review client talks to.
//!
//! Builds persona prompts for each review stage, forwards them to the language
//! model and turns the reply into a pass/fail verdict. Also counts usage and
//! session lifecycle events for the admin stats route.

pub mod api;
pub mod llm;
pub mod personas;
pub mod rate_limiter;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

pub use api::{AppState, SharedState};
pub use llm::{AnthropicBackend, LlmBackend};
pub use rate_limiter::RateLimiter;

use crate::session::UsageStats;

/// Configuration for `simulearn serve`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub dev_mode: bool,
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            dev_mode: false,
            rate_limit_window: rate_limiter::DEFAULT_WINDOW,
            rate_limit_max: rate_limiter::DEFAULT_MAX_REQUESTS,
        }
    }
}

impl AppState {
    pub fn new(llm: Arc<dyn LlmBackend>, config: &ServerConfig) -> Self {
        Self {
            llm,
            limiter: RateLimiter::new(config.rate_limit_window, config.rate_limit_max),
            stats: Arc::new(UsageStats::new()),
        }
    }
}

/// Build the full application router.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// Start the judge service and run until Ctrl+C.
pub async fn start_server(config: ServerConfig, llm: Arc<dyn LlmBackend>) -> Result<()> {
    let state = Arc::new(AppState::new(llm, &config));
    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    println!("SimuLearn judge running at http://{}", local_addr);
    tracing::info!(%local_addr, dev_mode = config.dev_mode, "judge service started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
