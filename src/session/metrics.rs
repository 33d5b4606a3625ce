//! Usage metrics.
//!
//! The orchestrator reports session lifecycle events through a [`MetricsSink`]
//! it is handed at construction. The judge service owns a [`UsageStats`] sink
//! and exposes it on the admin route; the CLI forwards its events to that
//! service through [`RemoteMetrics`].

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

/// Service endpoints whose traffic is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiEndpoint {
    Feedback,
    DevInquiry,
}

#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn session_started(&self);
    async fn session_completed(&self);
    async fn api_request(&self, _endpoint: ApiEndpoint) {}
}

/// Discards every event.
pub struct NoopMetrics;

#[async_trait]
impl MetricsSink for NoopMetrics {
    async fn session_started(&self) {}
    async fn session_completed(&self) {}
}

#[derive(Debug, Clone)]
struct Counters {
    total_requests: u64,
    today_requests: u64,
    feedback_requests: u64,
    dev_inquiry_requests: u64,
    today: NaiveDate,
    active_sessions: u64,
    completed_sessions: u64,
}

impl Counters {
    fn fresh(today: NaiveDate) -> Self {
        Self {
            total_requests: 0,
            today_requests: 0,
            feedback_requests: 0,
            dev_inquiry_requests: 0,
            today,
            active_sessions: 0,
            completed_sessions: 0,
        }
    }

    fn roll_day(&mut self, today: NaiveDate) {
        if self.today != today {
            self.today_requests = 0;
            self.today = today;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUsage {
    pub total_requests: u64,
    pub today_requests: u64,
    pub feedback_requests: u64,
    pub dev_inquiry_requests: u64,
    /// Always 0: there is no raw model passthrough route. Kept so existing
    /// dashboards reading `claudeRequests` still parse the report.
    pub claude_requests: u64,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUsage {
    pub active_sessions: u64,
    pub completed_sessions: u64,
    pub average_completion_rate: f64,
}

/// Point-in-time view of [`UsageStats`], as served by `/api/admin/stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub api: ApiUsage,
    pub sessions: SessionUsage,
}

/// In-memory counters. Lost on restart.
pub struct UsageStats {
    counters: Mutex<Counters>,
}

impl Default for UsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageStats {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::fresh(Utc::now().date_naive())),
        }
    }

    fn counters(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record_request_on(&self, endpoint: ApiEndpoint, today: NaiveDate) {
        let mut c = self.counters();
        c.roll_day(today);
        c.total_requests += 1;
        c.today_requests += 1;
        match endpoint {
            ApiEndpoint::Feedback => c.feedback_requests += 1,
            ApiEndpoint::DevInquiry => c.dev_inquiry_requests += 1,
        }
    }

    pub fn record_request(&self, endpoint: ApiEndpoint) {
        self.record_request_on(endpoint, Utc::now().date_naive());
    }

    pub fn record_session_start(&self) {
        self.counters().active_sessions += 1;
    }

    pub fn record_session_complete(&self) {
        let mut c = self.counters();
        c.active_sessions = c.active_sessions.saturating_sub(1);
        c.completed_sessions += 1;
    }

    fn snapshot_on(&self, today: NaiveDate) -> StatsReport {
        let mut c = self.counters();
        c.roll_day(today);
        let total = c.active_sessions + c.completed_sessions;
        let average_completion_rate = if total > 0 {
            c.completed_sessions as f64 / total as f64
        } else {
            0.0
        };
        StatsReport {
            api: ApiUsage {
                total_requests: c.total_requests,
                today_requests: c.today_requests,
                feedback_requests: c.feedback_requests,
                dev_inquiry_requests: c.dev_inquiry_requests,
                claude_requests: 0,
                last_updated: Utc::now().to_rfc3339(),
            },
            sessions: SessionUsage {
                active_sessions: c.active_sessions,
                completed_sessions: c.completed_sessions,
                average_completion_rate,
            },
        }
    }

    pub fn snapshot(&self) -> StatsReport {
        self.snapshot_on(Utc::now().date_naive())
    }

    pub fn reset(&self) {
        *self.counters() = Counters::fresh(Utc::now().date_naive());
    }
}

#[async_trait]
impl MetricsSink for UsageStats {
    async fn session_started(&self) {
        self.record_session_start();
    }

    async fn session_completed(&self) {
        self.record_session_complete();
    }

    async fn api_request(&self, endpoint: ApiEndpoint) {
        self.record_request(endpoint);
    }
}

/// Forwards lifecycle events to a running judge service.
///
/// Delivery is best effort; failures are logged and never reach the session.
pub struct RemoteMetrics {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteMetrics {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, event: &str) {
        let url = format!("{}/api/sessions/{}", self.base_url, event);
        match self.client.post(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(event, "session event reported");
            }
            Ok(resp) => {
                tracing::warn!(event, status = %resp.status(), "metrics endpoint rejected session event");
            }
            Err(e) => {
                tracing::warn!(event, error = %e, "failed to report session event");
            }
        }
    }
}

#[async_trait]
impl MetricsSink for RemoteMetrics {
    async fn session_started(&self) {
        self.post("start").await;
    }

    async fn session_completed(&self) {
        self.post("complete").await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_counters_and_completion_rate() {
        let stats = UsageStats::new();
        stats.session_started().await;
        stats.session_started().await;
        stats.session_completed().await;

        let report = stats.snapshot();
        assert_eq!(report.sessions.active_sessions, 1);
        assert_eq!(report.sessions.completed_sessions, 1);
        assert!((report.sessions.average_completion_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_completion_without_start_saturates() {
        let stats = UsageStats::new();
        stats.record_session_complete();
        let report = stats.snapshot();
        assert_eq!(report.sessions.active_sessions, 0);
        assert_eq!(report.sessions.completed_sessions, 1);
        assert!((report.sessions.average_completion_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_request_counters_per_endpoint() {
        let stats = UsageStats::new();
        stats.record_request(ApiEndpoint::Feedback);
        stats.record_request(ApiEndpoint::Feedback);
        stats.record_request(ApiEndpoint::DevInquiry);
        let report = stats.snapshot();
        assert_eq!(report.api.total_requests, 3);
        assert_eq!(report.api.today_requests, 3);
        assert_eq!(report.api.feedback_requests, 2);
        assert_eq!(report.api.dev_inquiry_requests, 1);
    }

    #[test]
    fn test_today_counter_rolls_over() {
        let stats = UsageStats::new();
        let day1 = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        stats.record_request_on(ApiEndpoint::Feedback, day1);
        stats.record_request_on(ApiEndpoint::Feedback, day1);
        stats.record_request_on(ApiEndpoint::DevInquiry, day2);

        let report = stats.snapshot_on(day2);
        assert_eq!(report.api.total_requests, 3);
        assert_eq!(report.api.today_requests, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let stats = UsageStats::new();
        stats.record_request(ApiEndpoint::Feedback);
        stats.record_session_start();
        stats.reset();
        let report = stats.snapshot();
        assert_eq!(report.api.total_requests, 0);
        assert_eq!(report.sessions.active_sessions, 0);
        assert_eq!(report.sessions.average_completion_rate, 0.0);
    }

    #[test]
    fn test_report_wire_shape() {
        let report = UsageStats::new().snapshot();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["api"]["totalRequests"].is_u64());
        assert!(json["api"]["lastUpdated"].is_string());
        assert_eq!(json["api"]["claudeRequests"], 0);
        assert!(json["sessions"]["averageCompletionRate"].is_number());
    }

    #[tokio::test]
    async fn test_remote_metrics_swallows_connection_errors() {
        let metrics = RemoteMetrics::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        metrics.session_started().await;
        metrics.session_completed().await;
    }
}
