//! Integration tests driving the full router.
//!
//! ## Test Modules
//!
//! - **product_api_tests**: catalog browsing and search
//! - **cart_api_tests**: session cart lifecycle
//! - **admin_api_tests**: login, guard and product management
//! - **recommendation_api_tests**: sleep advice and pairings
//! - **security_pipeline_tests**: the layered request filters end to end
//! - **health_api_tests**: operational endpoints
//! - **config_tests**: configuration loading and validation
//! - **db_tests**: schema initialization
//! - **error_tests**: the JSON error envelope

pub mod config_tests;
pub mod db_tests;

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::config::{AppConfig, Environment};
use crate::state::AppState;

pub const BROWSER_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub const SITE_ORIGIN: &str = "http://localhost:5000";

pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
    crate::db::init_db(&pool).await.unwrap();
    pool
}

/// App over a seeded in-memory database.
pub async fn app_with(env: Environment) -> (Router, AppState) {
    let pool = memory_pool().await;
    crate::seed::seed_catalog(&pool).await.unwrap();

    let mut config = AppConfig::default();
    config.server.environment = env;
    config.server.static_dir = None;

    let state = AppState::new(pool, config);
    (crate::build_router(state.clone()), state)
}

/// Development profile: loopback callers are never banned and limits are loose.
pub async fn dev_app() -> (Router, AppState) {
    app_with(Environment::Development).await
}

/// Browser-like GET.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).header(header::USER_AGENT, BROWSER_UA).body(Body::empty()).unwrap()
}

/// Same-origin JSON request as the storefront client sends it.
pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::USER_AGENT, BROWSER_UA)
        .header(header::ORIGIN, SITE_ORIGIN)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Same-origin request without a body (DELETE).
pub fn bodiless(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::USER_AGENT, BROWSER_UA)
        .header(header::ORIGIN, SITE_ORIGIN)
        .body(Body::empty())
        .unwrap()
}

pub fn with_header(mut req: Request<Body>, name: &'static str, value: &str) -> Request<Body> {
    req.headers_mut().insert(name, value.parse().unwrap());
    req
}

pub async fn body_json(res: Response<Body>) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
