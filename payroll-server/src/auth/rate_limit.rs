//! Fixed-window rate limiting, keyed by route and client IP

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use shared::error::AppError;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::state::AppState;

/// Windows idle for longer than this are dropped by [`RateLimiter::cleanup`]
const IDLE_RETENTION: Duration = Duration::from_secs(300);

/// Attempt budget per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Limit {
    /// Login: 5 attempts per minute per client IP
    pub const LOGIN: Limit = Limit {
        max_attempts: 5,
        window: Duration::from_secs(60),
    };
}

struct Window {
    attempts: u32,
    started: Instant,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<(&'static str, String), Window>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempt. Once the budget is spent, returns how long until
    /// the window reopens.
    pub async fn check(&self, route: &'static str, client: &str, limit: Limit) -> Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry((route, client.to_owned()))
            .or_insert(Window {
                attempts: 0,
                started: now,
            });

        let elapsed = now.duration_since(window.started);
        if elapsed >= limit.window {
            window.attempts = 0;
            window.started = now;
        }

        window.attempts += 1;
        if window.attempts > limit.max_attempts {
            return Err(limit.window.saturating_sub(now.duration_since(window.started)));
        }
        Ok(())
    }

    pub async fn cleanup(&self) {
        let now = Instant::now();
        self.windows
            .lock()
            .await
            .retain(|_, w| now.duration_since(w.started) < IDLE_RETENTION);
    }

    pub async fn len(&self) -> usize {
        self.windows.lock().await.len()
    }
}

/// First `X-Forwarded-For` hop, else the peer address
fn client_ip(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_owned();
    }
    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Login route middleware; a refused attempt gets 429 with `Retry-After`
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    if let Err(retry_after) = state.rate_limiter.check("login", &ip, Limit::LOGIN).await {
        let secs = retry_after.as_secs().max(1);
        tracing::warn!(ip = %ip, retry_after_secs = secs, "Login rate limit exceeded");
        let mut response = AppError::too_many_requests()
            .with_detail("retryAfterSecs", secs)
            .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        return response;
    }
    next.run(request).await
}
