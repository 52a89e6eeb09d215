//! # Textile Home Backend Library
//!
//! HTTP JSON API for a small textile storefront: a product catalog, a
//! session-keyed shopping cart, an admin panel API and a layered
//! request-security pipeline in front of every API route.
//!
//! ## Architecture
//!
//! - **Axum**: routing, extractors and `from_fn` middleware
//! - **SQLx**: asynchronous SQLite access
//! - **Tokio**: async runtime and background maintenance tasks
//! - **Serde**: JSON payloads
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration (embedded defaults, file, environment)
//! - [`db`]: schema initialization
//! - [`error`]: the JSON error envelope
//! - [`metrics`]: security and storefront counters
//! - [`middleware`]: the request-security pipeline
//! - [`monitor`]: blocklist and suspicious-activity tracking
//! - [`recommend`]: mascot advice and "complete the set" pairings
//! - [`routes`]: HTTP API handlers
//! - [`seed`]: demo catalog and bootstrap admin
//! - [`state`]: shared application state
//! - [`store`]: repositories over the pool
//! - [`types`]: domain types and request payloads

pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod monitor;
pub mod recommend;
pub mod routes;
pub mod seed;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::error::AppError;
use crate::middleware::{
    activity::track_suspicious_activity,
    blocklist::ip_blocking,
    bot::block_bots,
    csrf::csrf_protection,
    honeypot::honeypot,
    injection::{sql_injection_guard, xss_sanitizer},
    rate_limit::{endpoint_rate_limit, general_rate_limit, strict_rate_limit},
    security_headers::security_headers_middleware,
    validation::{limit_request_size, validate_request_headers},
};
use crate::state::AppState;

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

/// Attaches the SPA bundle as fallback when `server.static_dir` holds an `index.html`.
fn with_fallback(router: Router<AppState>, static_dir: Option<&str>) -> Router<AppState> {
    let Some(dir) = static_dir.map(Path::new) else {
        return router.fallback(not_found);
    };
    let index = dir.join("index.html");
    if !dir.is_dir() || !index.is_file() {
        tracing::warn!("static_dir {} has no index.html, not serving the client", dir.display());
        return router.fallback(not_found);
    }
    let spa = ServeDir::new(dir).append_index_html_on_directories(true).not_found_service(ServeFile::new(index));
    router.fallback_service(spa)
}

/// Builds the full application router.
///
/// API routes and the client fallback sit behind the security pipeline
/// (see [`middleware`]); the operational endpoints only get tracing and
/// security headers.
pub fn build_router(state: AppState) -> Router {
    let cfg = state.config.clone();

    // `.layer` wraps everything added before it, so the innermost layer comes first.
    let guarded = with_fallback(Router::new().nest("/api", routes::api_router()), cfg.server.static_dir.as_deref())
        .layer(from_fn_with_state(state.clone(), endpoint_rate_limit))
        .layer(from_fn_with_state(state.clone(), general_rate_limit))
        .layer(from_fn_with_state(state.clone(), strict_rate_limit))
        .layer(from_fn_with_state(state.clone(), track_suspicious_activity))
        .layer(from_fn_with_state(state.clone(), block_bots))
        .layer(from_fn_with_state(state.clone(), csrf_protection))
        .layer(from_fn_with_state(state.clone(), xss_sanitizer))
        .layer(from_fn_with_state(state.clone(), sql_injection_guard))
        .layer(from_fn_with_state(state.clone(), validate_request_headers))
        .layer(from_fn_with_state(state.clone(), limit_request_size))
        .layer(from_fn_with_state(state.clone(), ip_blocking))
        .layer(from_fn_with_state(state.clone(), honeypot));

    let ops = Router::new()
        .route("/healthz", get(routes::health::healthz))
        .route("/readyz", get(routes::health::readyz))
        .route("/metrics", get(routes::health::metrics))
        .route("/metrics/prometheus", get(routes::health::metrics_prometheus))
        .route("/version", get(routes::health::version));

    let app = guarded
        .merge(ops)
        .with_state(state)
        .layer(DefaultBodyLimit::max(cfg.security.max_body_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg.clone(), security_headers_middleware));

    // The Vite dev server runs on its own origin
    if cfg.server.environment.is_development() {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
