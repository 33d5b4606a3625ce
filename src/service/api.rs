use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;

use crate::errors::LlmError;
use crate::judge::{Inquiry, Verdict};
use crate::session::metrics::{ApiEndpoint, MetricsSink, UsageStats};
use crate::session::model::senders;
use crate::session::{Difficulty, ReviewStage};

use super::llm::{CompletionRequest, LlmBackend};
use super::personas::{self, DEV_INQUIRY_SYSTEM_PROMPT};
use super::rate_limiter::{RateLimiter, client_key};

const FEEDBACK_MAX_TOKENS: u32 = 300;
const FEEDBACK_TEMPERATURE: f32 = 0.8;
const INQUIRY_MAX_TOKENS: u32 = 200;
const INQUIRY_TEMPERATURE: f32 = 0.9;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub llm: Arc<dyn LlmBackend>,
    pub limiter: RateLimiter,
    pub stats: Arc<UsageStats>,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    RateLimited(HeaderMap),
    Upstream(StatusCode),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, headers, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, HeaderMap::new(), msg),
            ApiError::RateLimited(headers) => (
                StatusCode::TOO_MANY_REQUESTS,
                headers,
                "Too many requests".to_string(),
            ),
            ApiError::Upstream(status) => (status, HeaderMap::new(), "LLM request failed".to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new(), msg),
        };
        (status, headers, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Status { status, .. } => ApiError::Upstream(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            ),
            LlmError::EmptyCompletion => ApiError::Internal("Empty response from LLM".into()),
            other => {
                tracing::error!(error = %other, "LLM call failed");
                ApiError::Internal("Internal server error".into())
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/feedback", post(feedback))
        .route("/api/dev-inquiry", post(dev_inquiry))
        .route("/api/admin/stats", get(admin_stats).delete(reset_stats))
        .route("/api/sessions/start", post(session_start))
        .route("/api/sessions/complete", post(session_complete))
}

// ── Helpers ───────────────────────────────────────────────────────────

fn enforce_rate_limit(state: &AppState, scope: &str, headers: &HeaderMap) -> Result<(), ApiError> {
    let key = format!("{}:{}", scope, client_key(headers));
    let decision = state.limiter.check(&key);
    if !decision.allowed {
        tracing::warn!(%key, "rate limit exceeded");
        return Err(ApiError::RateLimited(state.limiter.headers(&decision)));
    }
    Ok(())
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::BadRequest("Invalid JSON body".into()))
}

fn non_empty_str<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Non-negative counter from the body; absent means 0, oversized saturates.
fn count_field(body: &Value, field: &str) -> u32 {
    body.get(field)
        .and_then(Value::as_u64)
        .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn feedback(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Verdict>, ApiError> {
    enforce_rate_limit(&state, "feedback", &headers)?;
    let body = parse_body(&body)?;

    let (Some(draft), Some(stage)) = (
        non_empty_str(&body, "prdContent"),
        non_empty_str(&body, "reviewStage"),
    ) else {
        return Err(ApiError::BadRequest(
            "prdContent and reviewStage are required".into(),
        ));
    };

    let persona = stage
        .parse::<ReviewStage>()
        .ok()
        .and_then(personas::persona_for)
        .ok_or_else(|| ApiError::BadRequest("Invalid reviewStage".into()))?;
    let attempts = count_field(&body, "stageAttempts");
    let difficulty = body
        .get("missionDifficulty")
        .and_then(Value::as_str)
        .and_then(|d| d.parse::<Difficulty>().ok())
        .unwrap_or(Difficulty::Normal);

    let request = CompletionRequest {
        system: persona.system_prompt,
        user: personas::review_message(persona, draft, attempts, difficulty),
        max_tokens: FEEDBACK_MAX_TOKENS,
        temperature: FEEDBACK_TEMPERATURE,
    };

    state.stats.api_request(ApiEndpoint::Feedback).await;
    let reply = state.llm.complete(request).await?;
    let (passed, message) = personas::parse_reply(&reply);
    tracing::info!(reviewer = persona.name, passed, attempts, %difficulty, "review graded");

    Ok(Json(Verdict {
        passed,
        message,
        sender_id: persona.sender_id.to_string(),
    }))
}

async fn dev_inquiry(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Inquiry>, ApiError> {
    enforce_rate_limit(&state, "dev-inquiry", &headers)?;
    let body = parse_body(&body)?;

    let Some(draft) = non_empty_str(&body, "prdContent") else {
        return Err(ApiError::BadRequest("prdContent is required".into()));
    };
    let attempt = count_field(&body, "attempt");

    state.stats.api_request(ApiEndpoint::DevInquiry).await;
    let reply = state
        .llm
        .complete(CompletionRequest {
            system: DEV_INQUIRY_SYSTEM_PROMPT,
            user: personas::inquiry_message(draft, attempt),
            max_tokens: INQUIRY_MAX_TOKENS,
            temperature: INQUIRY_TEMPERATURE,
        })
        .await?;

    let message = reply.trim();
    if message.is_empty() {
        return Err(LlmError::EmptyCompletion.into());
    }

    Ok(Json(Inquiry {
        message: message.to_string(),
        sender_id: senders::DEVELOPER.to_string(),
    }))
}

async fn admin_stats(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.stats.snapshot())
}

async fn reset_stats(State(state): State<SharedState>) -> StatusCode {
    state.stats.reset();
    tracing::info!("usage stats reset");
    StatusCode::NO_CONTENT
}

async fn session_start(State(state): State<SharedState>) -> StatusCode {
    state.stats.session_started().await;
    StatusCode::NO_CONTENT
}

async fn session_complete(State(state): State<SharedState>) -> StatusCode {
    state.stats.session_completed().await;
    StatusCode::NO_CONTENT
}
