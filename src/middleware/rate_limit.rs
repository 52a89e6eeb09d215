use super::ip::client_ip;
use crate::config::Environment;
use crate::error::error_body;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::{
    collections::HashMap,
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Rejection produced by a limiter. Renders as `429` with `Retry-After`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub retry_after: Duration,
}

impl RateLimited {
    fn retry_after_secs(&self) -> u64 {
        // Round up so clients never retry early
        let secs = self.retry_after.as_secs();
        if self.retry_after.subsec_nanos() > 0 { secs + 1 } else { secs.max(1) }
    }
}

impl IntoResponse for RateLimited {
    fn into_response(self) -> Response {
        let secs = self.retry_after_secs();
        let mut body = error_body(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Too many requests from this IP, please try again later.",
        );
        body["retry_after_seconds"] = secs.into();
        let mut res = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(v) = HeaderValue::from_str(&secs.to_string()) {
            res.headers_mut().insert(RETRY_AFTER, v);
        }
        res
    }
}

/// Which responses consume quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    Every,
    /// Only responses with status >= 400 are counted.
    FailuresOnly,
}

/// A thread-safe rate limiter based on the sliding window algorithm.
#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<IpAddr, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
    mode: CountMode,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_requests` per `window_seconds` per IP.
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_seconds),
            mode: CountMode::Every,
        }
    }

    pub fn failures_only(mut self) -> Self {
        self.mode = CountMode::FailuresOnly;
        self
    }

    pub fn mode(&self) -> CountMode {
        self.mode
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    fn prune(&self, timestamps: &mut Vec<Instant>, now: Instant) {
        // On clock skew keep the timestamp
        timestamps.retain(|&t| now.checked_duration_since(t).map(|d| d < self.window).unwrap_or(true));
    }

    fn retry_after(&self, timestamps: &[Instant], now: Instant) -> Duration {
        let oldest = timestamps.first().copied().unwrap_or(now);
        match now.checked_duration_since(oldest) {
            Some(elapsed) => self.window.saturating_sub(elapsed),
            None => Duration::from_secs(1),
        }
    }

    /// Checks the quota and, when allowed, records the request.
    pub async fn check_rate_limit(&self, ip: IpAddr) -> Result<(), RateLimited> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let timestamps = requests.entry(ip).or_default();
        self.prune(timestamps, now);

        if timestamps.len() >= self.max_requests {
            return Err(RateLimited { retry_after: self.retry_after(timestamps, now) });
        }
        timestamps.push(now);
        Ok(())
    }

    /// Checks the quota without consuming it.
    pub async fn check_without_recording(&self, ip: IpAddr) -> Result<(), RateLimited> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let Some(timestamps) = requests.get_mut(&ip) else {
            return Ok(());
        };
        self.prune(timestamps, now);
        if timestamps.len() >= self.max_requests {
            return Err(RateLimited { retry_after: self.retry_after(timestamps, now) });
        }
        Ok(())
    }

    pub async fn record_hit(&self, ip: IpAddr) {
        self.requests.write().await.entry(ip).or_default().push(Instant::now());
    }

    /// Removes IPs with no requests inside the window.
    pub async fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, timestamps| {
            self.prune(timestamps, now);
            !timestamps.is_empty()
        });
    }

    pub async fn tracked_ips(&self) -> usize {
        self.requests.read().await.len()
    }
}

/// Limiters keyed by path prefix.
#[derive(Clone)]
pub struct EndpointRateLimiter {
    limiters: Arc<Vec<(String, RateLimiter)>>,
}

impl Default for EndpointRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl EndpointRateLimiter {
    pub fn new() -> Self {
        Self { limiters: Arc::new(Vec::new()) }
    }

    /// Adds prefix limiters. A later entry for the same prefix replaces the earlier one.
    pub fn with_limits(self, limits: Vec<(&str, RateLimiter)>) -> Self {
        let mut all: Vec<(String, RateLimiter)> = self.limiters.iter().cloned().collect();
        for (prefix, limiter) in limits {
            all.retain(|(p, _)| p != prefix);
            all.push((prefix.to_string(), limiter));
        }
        // Longest prefix first so the most specific limiter wins
        all.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { limiters: Arc::new(all) }
    }

    /// The limiter whose prefix covers `path`, if any.
    pub fn limiter_for(&self, path: &str) -> Option<&RateLimiter> {
        self.limiters.iter().find(|(prefix, _)| matches_prefix(path, prefix)).map(|(_, l)| l)
    }

    /// Cleans up old entries from all prefix limiters.
    pub async fn cleanup_all(&self) {
        for (_, limiter) in self.limiters.iter() {
            limiter.cleanup_old_entries().await;
        }
    }
}

/// Request budgets per deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitTiers {
    pub strict: (usize, u64),
    pub general: (usize, u64),
    pub cart: (usize, u64),
    pub search: (usize, u64),
}

impl RateLimitTiers {
    pub fn for_environment(env: Environment) -> Self {
        if env.is_development() {
            Self { strict: (100, 60), general: (500, 15 * 60), cart: (50, 5 * 60), search: (30, 60) }
        } else {
            Self { strict: (30, 60), general: (200, 15 * 60), cart: (15, 5 * 60), search: (10, 60) }
        }
    }
}

/// Every limiter in the pipeline.
#[derive(Clone)]
pub struct RateLimiters {
    pub strict: RateLimiter,
    pub general: RateLimiter,
    pub endpoints: EndpointRateLimiter,
}

impl RateLimiters {
    pub fn new(tiers: RateLimitTiers) -> Self {
        let endpoints = EndpointRateLimiter::new().with_limits(vec![
            ("/api/cart", RateLimiter::new(tiers.cart.0, tiers.cart.1).failures_only()),
            ("/api/products/search", RateLimiter::new(tiers.search.0, tiers.search.1)),
        ]);
        Self {
            strict: RateLimiter::new(tiers.strict.0, tiers.strict.1),
            general: RateLimiter::new(tiers.general.0, tiers.general.1),
            endpoints,
        }
    }

    pub async fn cleanup_all(&self) {
        self.strict.cleanup_old_entries().await;
        self.general.cleanup_old_entries().await;
        self.endpoints.cleanup_all().await;
    }
}

fn reject(state: &AppState, ip: IpAddr, path: &str, limited: RateLimited) -> Response {
    tracing::warn!(target: "security", %ip, path, "Rate limit exceeded");
    state.metrics.inc_rate_limited();
    limited.into_response()
}

async fn apply(state: &AppState, limiter: &RateLimiter, req: Request, next: Next) -> Response {
    let ip = client_ip(&req, state.config.security.trust_proxy_hops);
    let path = req.uri().path().to_string();

    match limiter.mode() {
        CountMode::Every => match limiter.check_rate_limit(ip).await {
            Ok(()) => next.run(req).await,
            Err(limited) => reject(state, ip, &path, limited),
        },
        CountMode::FailuresOnly => {
            if let Err(limited) = limiter.check_without_recording(ip).await {
                return reject(state, ip, &path, limited);
            }
            let res = next.run(req).await;
            if res.status().as_u16() >= 400 {
                limiter.record_hit(ip).await;
            }
            res
        }
    }
}

/// Short-window global limiter.
pub async fn strict_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let limiter = state.limiters.strict.clone();
    apply(&state, &limiter, req, next).await
}

/// Long-window global limiter.
pub async fn general_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let limiter = state.limiters.general.clone();
    apply(&state, &limiter, req, next).await
}

/// Per-prefix limiters (`/api/cart`, `/api/products/search`).
pub async fn endpoint_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(limiter) = state.limiters.endpoints.limiter_for(req.uri().path()).cloned() else {
        return next.run(req).await;
    };
    apply(&state, &limiter, req, next).await
}
