//! Security headers middleware for HTTP responses.
//!
//! Adds anti-sniffing, framing, referrer and cross-origin headers to every
//! response, plus CSP and HSTS from configuration. JSON responses are marked
//! non-cacheable; hashed static bundles get long-lived caching.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::{AppConfig, SecurityConfig};

const DEFAULT_CSP: &str = "default-src 'self'; img-src 'self' https://images.unsplash.com data:; \
object-src 'none'; frame-src 'none'";

/// `Strict-Transport-Security` value, when enabled.
pub fn hsts_value(sec: &SecurityConfig) -> Option<String> {
    if !sec.enable_hsts.unwrap_or(false) {
        return None;
    }
    let mut value = format!("max-age={}", sec.hsts_max_age.unwrap_or(31_536_000));
    if sec.hsts_include_subdomains.unwrap_or(false) {
        value.push_str("; includeSubDomains");
    }
    if sec.hsts_preload.unwrap_or(false) {
        value.push_str("; preload");
    }
    Some(value)
}

fn apply_cache_policy(headers: &mut HeaderMap) {
    let ct = headers.get(CONTENT_TYPE).and_then(|ct| ct.to_str().ok()).map(str::to_string);
    let Some(ct) = ct else {
        return;
    };
    if ct.starts_with("application/json") {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    } else if ct.starts_with("text/css")
        || ct.starts_with("application/javascript")
        || ct.starts_with("text/javascript")
    {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=31536000, immutable"));
        headers.remove(PRAGMA);
    }
}

/// Adds standard security-related HTTP headers to all responses.
pub async fn security_headers_middleware(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    headers.insert(HeaderName::from_static("x-content-type-options"), HeaderValue::from_static("nosniff"));
    headers.insert(HeaderName::from_static("x-frame-options"), HeaderValue::from_static("DENY"));
    headers.insert(HeaderName::from_static("referrer-policy"), HeaderValue::from_static("no-referrer"));
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("geolocation=(), microphone=(), camera=(), payment=()"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );

    let sec = &cfg.security;
    if let Some(value) = hsts_value(sec) {
        if let Ok(v) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static("strict-transport-security"), v);
        }
    }

    let csp = sec.csp.as_deref().map(str::trim).filter(|c| !c.is_empty()).unwrap_or(DEFAULT_CSP);
    match HeaderValue::from_str(csp) {
        Ok(v) => {
            headers.insert(HeaderName::from_static("content-security-policy"), v);
        }
        Err(e) => tracing::warn!("Invalid Content-Security-Policy in config: {}", e),
    }

    apply_cache_policy(headers);
    res
}
