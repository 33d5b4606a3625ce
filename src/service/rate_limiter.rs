//! Fixed-window request limiter keyed by caller.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderValue};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_REQUESTS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_in: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    resets_at: Instant,
}

#[derive(Debug)]
struct Entries {
    windows: HashMap<String, Window>,
    /// Expired windows are swept at most once per window length.
    last_sweep: Instant,
}

pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    entries: Mutex<Entries>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            entries: Mutex::new(Entries {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Number of callers currently holding a window.
    pub fn tracked_keys(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).windows.len()
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if now >= entries.last_sweep + self.window {
            entries.windows.retain(|_, w| now <= w.resets_at);
            entries.last_sweep = now;
        }

        match entries.windows.get_mut(key) {
            Some(window) if now <= window.resets_at => {
                let reset_in = window.resets_at - now;
                if window.count >= self.max_requests {
                    return RateDecision {
                        allowed: false,
                        remaining: 0,
                        reset_in,
                    };
                }
                window.count += 1;
                RateDecision {
                    allowed: true,
                    remaining: self.max_requests - window.count,
                    reset_in,
                }
            }
            _ => {
                entries.windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        resets_at: now + self.window,
                    },
                );
                RateDecision {
                    allowed: true,
                    remaining: self.max_requests.saturating_sub(1),
                    reset_in: self.window,
                }
            }
        }
    }

    /// `X-RateLimit-*` headers describing `decision`. Reset is in whole seconds, rounded up.
    pub fn headers(&self, decision: &RateDecision) -> HeaderMap {
        let reset_secs = decision.reset_in.as_millis().div_ceil(1000);
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from(self.max_requests));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
        headers.insert("x-ratelimit-reset", HeaderValue::from(reset_secs as u64));
        headers
    }
}

/// Identify the caller from proxy headers.
pub fn client_key(headers: &HeaderMap) -> String {
    ["x-forwarded-for", "x-real-ip"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}
