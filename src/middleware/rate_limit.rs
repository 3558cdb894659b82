// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed-window rate limiting.
//!
//! Counters live in process memory, one window per key. A key's window opens
//! on its first request and resets once `window` has elapsed. Keys are
//! `user:{id}` for identified callers and `ip:{addr}` otherwise.

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::Tier;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const FIFTEEN_MINUTES: Duration = Duration::from_secs(15 * 60);
const ONE_HOUR: Duration = Duration::from_secs(60 * 60);

/// Quota parameters for one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
    /// Refund requests whose response status is below 400.
    pub skip_successful_requests: bool,
}

impl RateLimitPolicy {
    /// Gateway-wide limit: 100 requests per 15 minutes.
    pub const GLOBAL: Self = Self {
        max_requests: 100,
        window: FIFTEEN_MINUTES,
        skip_successful_requests: false,
    };

    /// Credential endpoints: 5 failed attempts per 15 minutes.
    pub const AUTH: Self = Self {
        max_requests: 5,
        window: FIFTEEN_MINUTES,
        skip_successful_requests: true,
    };

    /// Hourly quota for a subscription tier.
    pub const fn for_tier(tier: Tier) -> Self {
        let max_requests = match tier {
            Tier::Free => 100,
            Tier::Starter => 1_000,
            Tier::Professional => 10_000,
            Tier::Enterprise => 100_000,
        };
        Self {
            max_requests,
            window: ONE_HOUR,
            skip_successful_requests: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_after: Duration,
        window_started: Instant,
    },
    Limited {
        limit: u32,
        retry_after: Duration,
    },
}

/// Per-key fixed-window counter.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    trust_proxy: bool,
    counters: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            trust_proxy: false,
            counters: DashMap::new(),
        }
    }

    pub fn global() -> Self {
        Self::new(RateLimitPolicy::GLOBAL)
    }

    pub fn auth() -> Self {
        Self::new(RateLimitPolicy::AUTH)
    }

    pub fn for_tier(tier: Tier) -> Self {
        Self::new(RateLimitPolicy::for_tier(tier))
    }

    /// Take the client address from `X-Forwarded-For` when present.
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Count one request for `key`.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let limit = self.policy.max_requests;
        let mut window = self.counters.entry(key.to_string()).or_insert(Window {
            started: now,
            hits: 0,
        });

        if now.duration_since(window.started) >= self.policy.window {
            *window = Window {
                started: now,
                hits: 0,
            };
        }

        let reset_after = self
            .policy
            .window
            .saturating_sub(now.duration_since(window.started));

        if window.hits >= limit {
            return RateLimitDecision::Limited {
                limit,
                retry_after: reset_after,
            };
        }

        window.hits += 1;
        RateLimitDecision::Allowed {
            limit,
            remaining: limit - window.hits,
            reset_after,
            window_started: window.started,
        }
    }

    /// Give back one request counted in the window that started at `window_started`.
    pub fn refund(&self, key: &str, window_started: Instant) {
        if let Some(mut window) = self.counters.get_mut(key) {
            if window.started == window_started && window.hits > 0 {
                window.hits -= 1;
            }
        }
    }

    /// Drop windows that have fully elapsed. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.counters.len();
        let window = self.policy.window;
        self.counters
            .retain(|_, w| now.duration_since(w.started) < window);
        before.saturating_sub(self.counters.len())
    }

    /// Rate-limit key for a request.
    pub fn key_for(&self, request: &Request) -> String {
        if let Some(user) = request.extensions().get::<AuthUser>() {
            return format!("user:{}", user.user_id);
        }
        format!("ip:{}", client_ip(request, self.trust_proxy))
    }
}

/// One limiter per subscription tier.
#[derive(Debug)]
pub struct TieredRateLimiter {
    limiters: [RateLimiter; 4],
}

impl TieredRateLimiter {
    pub fn new(trust_proxy: bool) -> Self {
        Self {
            limiters: Tier::ALL.map(|tier| RateLimiter::for_tier(tier).trust_proxy(trust_proxy)),
        }
    }

    pub fn limiter(&self, tier: Tier) -> &RateLimiter {
        let index = Tier::ALL
            .iter()
            .position(|t| *t == tier)
            .unwrap_or_default();
        &self.limiters[index]
    }

    pub fn purge_expired(&self, now: Instant) -> usize {
        self.limiters.iter().map(|l| l.purge_expired(now)).sum()
    }
}

/// Limiters used by a process.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub global: Arc<RateLimiter>,
    pub auth: Arc<RateLimiter>,
    pub tiered: Arc<TieredRateLimiter>,
}

impl RateLimits {
    pub fn new(trust_proxy: bool) -> Self {
        Self {
            global: Arc::new(RateLimiter::global().trust_proxy(trust_proxy)),
            auth: Arc::new(RateLimiter::auth().trust_proxy(trust_proxy)),
            tiered: Arc::new(TieredRateLimiter::new(trust_proxy)),
        }
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        self.global.purge_expired(now) + self.auth.purge_expired(now) + self.tiered.purge_expired(now)
    }
}

/// Client address: last `X-Forwarded-For` hop when trusted, else the socket peer.
pub fn client_ip(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.rsplit(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Apply a single limiter (global or auth).
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = limiter.key_for(&request);
    run_limited(&limiter, key, request, next).await
}

/// Apply the limiter matching the caller's tier. Anonymous callers get the free tier.
pub async fn enforce_tiered(
    State(tiered): State<Arc<TieredRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let tier = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.tier)
        .unwrap_or_default();
    let limiter = tiered.limiter(tier);
    let key = limiter.key_for(&request);
    run_limited(limiter, key, request, next).await
}

async fn run_limited(limiter: &RateLimiter, key: String, request: Request, next: Next) -> Response {
    let policy = limiter.policy();

    match limiter.check(&key) {
        RateLimitDecision::Limited { limit, retry_after } => {
            tracing::warn!(
                key = %key,
                limit,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            let mut response = AppError::RateLimited {
                window: policy.window,
                retry_after,
            }
            .into_response();
            set_headers(response.headers_mut(), limit, 0, retry_after);
            response
        }
        RateLimitDecision::Allowed {
            limit,
            mut remaining,
            reset_after,
            window_started,
        } => {
            let mut response = next.run(request).await;
            if policy.skip_successful_requests && response.status().as_u16() < 400 {
                limiter.refund(&key, window_started);
                remaining = (remaining + 1).min(limit);
            }
            set_headers(response.headers_mut(), limit, remaining, reset_after);
            response
        }
    }
}

fn set_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_after: Duration) {
    headers.insert("ratelimit-limit", HeaderValue::from(limit));
    headers.insert("ratelimit-remaining", HeaderValue::from(remaining));
    headers.insert(
        "ratelimit-reset",
        HeaderValue::from(reset_after.as_secs().max(1)),
    );
}
