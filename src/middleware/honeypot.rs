//! Trap paths that only scanners request.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::ip::client_ip;
use super::validation::sanitize_for_logging;
use crate::state::AppState;

/// True when any `/`-separated segment of `path` equals a trap name (case-insensitive).
pub fn is_trap_path(path: &str, traps: &[String]) -> bool {
    path.split('/')
        .filter(|seg| !seg.is_empty())
        .any(|seg| traps.iter().any(|t| seg.eq_ignore_ascii_case(t)))
}

/// Blocks the caller permanently and answers with a fake success.
pub async fn honeypot(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.metrics.inc_requests_inspected();

    if !is_trap_path(req.uri().path(), &state.config.security.honeypot_paths) {
        return next.run(req).await;
    }

    let ip = client_ip(&req, state.config.security.trust_proxy_hops);
    state.metrics.inc_honeypot_hits();
    if state.monitor.block(ip).await {
        state.metrics.inc_permanent_bans();
    }
    tracing::warn!(
        target: "security",
        %ip,
        path = %sanitize_for_logging(req.uri().path()),
        "Honeypot triggered, IP blocked"
    );

    (StatusCode::OK, Json(json!({ "status": "success", "message": "Access granted" }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traps() -> Vec<String> {
        ["wp-admin", ".env", "config", "phpmyadmin"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matches_whole_segments_only() {
        let t = traps();
        assert!(is_trap_path("/wp-admin", &t));
        assert!(is_trap_path("/WP-Admin/install.php", &t));
        assert!(is_trap_path("/app/.env", &t));
        assert!(is_trap_path("/config", &t));

        assert!(!is_trap_path("/api/products", &t));
        assert!(!is_trap_path("/api/admin/login", &t));
        assert!(!is_trap_path("/configurator", &t));
        assert!(!is_trap_path("/", &t));
    }
}
