//! Single-attempt HTTP client for the judge service.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::errors::JudgeError;
use crate::session::ReviewStage;
use crate::session::model::senders;

use super::{Inquiry, InquiryRequest, ReviewJudge, ReviewRequest, Verdict};

/// Talks to `POST {base}/api/feedback` and `POST {base}/api/dev-inquiry`.
///
/// Every failure mode is reported as an error; retries and deadlines are the
/// caller's business.
#[derive(Debug, Clone)]
pub struct HttpJudge {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJudge {
    pub fn new(base_url: impl Into<String>) -> Result<Self, JudgeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("simulearn/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(JudgeError::Transport)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, JudgeError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "calling judge");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(JudgeError::Transport)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(JudgeError::RateLimited);
        }
        if !status.is_success() {
            return Err(JudgeError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| JudgeError::MalformedResponse(e.to_string()))
    }
}

/// Validate a feedback response body.
///
/// `passed` must be a boolean and `message` a string; `senderId` falls back to
/// the stage's reviewer.
pub fn parse_verdict(body: &Value, stage: ReviewStage) -> Result<Verdict, JudgeError> {
    let passed = body
        .get("passed")
        .and_then(Value::as_bool)
        .ok_or_else(|| JudgeError::MalformedResponse("missing boolean `passed`".to_string()))?;
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .ok_or_else(|| JudgeError::MalformedResponse("missing string `message`".to_string()))?;
    let sender_id = body
        .get("senderId")
        .and_then(Value::as_str)
        .unwrap_or_else(|| stage.sender_id());

    Ok(Verdict {
        passed,
        message: message.to_string(),
        sender_id: sender_id.to_string(),
    })
}

pub fn parse_inquiry(body: &Value) -> Result<Inquiry, JudgeError> {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| JudgeError::MalformedResponse("missing string `message`".to_string()))?;
    let sender_id = body
        .get("senderId")
        .and_then(Value::as_str)
        .unwrap_or(senders::DEVELOPER);

    Ok(Inquiry {
        message: message.to_string(),
        sender_id: sender_id.to_string(),
    })
}

#[async_trait]
impl ReviewJudge for HttpJudge {
    async fn request_verdict(&self, request: &ReviewRequest) -> Result<Verdict, JudgeError> {
        let body = self.post_json("/api/feedback", request).await?;
        parse_verdict(&body, request.review_stage)
    }

    async fn request_inquiry(&self, request: &InquiryRequest) -> Result<Inquiry, JudgeError> {
        let body = self.post_json("/api/dev-inquiry", request).await?;
        parse_inquiry(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Difficulty;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    #[test]
    fn test_parse_verdict_defaults_sender_to_stage() {
        let verdict = parse_verdict(
            &json!({"passed": true, "message": "좋습니다"}),
            ReviewStage::Qa,
        )
        .unwrap();
        assert!(verdict.passed);
        assert_eq!(verdict.sender_id, "qa-manager");
    }

    #[test]
    fn test_parse_verdict_rejects_non_boolean_passed() {
        let err = parse_verdict(
            &json!({"passed": "true", "message": "hm"}),
            ReviewStage::Designer,
        )
        .unwrap_err();
        assert!(matches!(err, JudgeError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_verdict_rejects_missing_message() {
        let err = parse_verdict(&json!({"passed": false}), ReviewStage::Designer).unwrap_err();
        assert!(err.to_string().contains("message"));
    }

    #[test]
    fn test_parse_inquiry_rejects_blank_message() {
        assert!(parse_inquiry(&json!({"message": "   "})).is_err());
        let inquiry = parse_inquiry(&json!({"message": "API 실패 시에는요?"})).unwrap();
        assert_eq!(inquiry.sender_id, "dev-senior");
    }

    async fn serve(app: Router) -> Option<String> {
        let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(e) => {
                eprintln!("Skipping judge client test (sandbox): {:?}", e);
                return None;
            }
        };
        let addr = listener.local_addr().ok()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Some(format!("http://{}", addr))
    }

    fn request() -> ReviewRequest {
        ReviewRequest {
            prd_content: "# 기획안".into(),
            review_stage: ReviewStage::Developer,
            stage_attempts: 1,
            mission_difficulty: Difficulty::Easy,
        }
    }

    #[tokio::test]
    async fn test_request_verdict_against_live_server() {
        let app = Router::new().route(
            "/api/feedback",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["reviewStage"], "developer");
                assert_eq!(body["missionDifficulty"], "easy");
                Json(json!({"passed": false, "message": "예외 처리가 없어요", "senderId": "dev-senior"}))
            }),
        );
        let Some(url) = serve(app).await else { return };

        let judge = HttpJudge::new(format!("{}/", url)).unwrap();
        let verdict = judge.request_verdict(&request()).await.unwrap();
        assert!(!verdict.passed);
        assert_eq!(verdict.message, "예외 처리가 없어요");
    }

    #[tokio::test]
    async fn test_rate_limit_and_status_errors() {
        let app = Router::new()
            .route(
                "/api/feedback",
                post(|| async { (AxumStatus::TOO_MANY_REQUESTS, Json(json!({"error": "Too many requests"}))) }),
            )
            .route(
                "/api/dev-inquiry",
                post(|| async { (AxumStatus::BAD_GATEWAY, "upstream down") }),
            );
        let Some(url) = serve(app).await else { return };

        let judge = HttpJudge::new(url).unwrap();
        let err = judge.request_verdict(&request()).await.unwrap_err();
        assert!(matches!(err, JudgeError::RateLimited));

        let err = judge
            .request_inquiry(&InquiryRequest {
                prd_content: "x".into(),
                attempt: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let app = Router::new().route("/api/feedback", post(|| async { "PASS: looks fine" }));
        let Some(url) = serve(app).await else { return };

        let judge = HttpJudge::new(url).unwrap();
        let err = judge.request_verdict(&request()).await.unwrap_err();
        assert!(matches!(err, JudgeError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_judge_is_transport_error() {
        let judge = HttpJudge::new("http://127.0.0.1:9").unwrap();
        let err = judge.request_verdict(&request()).await.unwrap_err();
        assert!(matches!(err, JudgeError::Transport(_)));
    }
}
