use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::ip::client_ip;
use crate::error::error_body;
use crate::monitor::Access;
use crate::state::AppState;

/// Refuses permanently and temporarily banned IPs.
pub async fn ip_blocking(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req, state.config.security.trust_proxy_hops);

    match state.monitor.check(ip).await {
        Access::Allowed => next.run(req).await,
        Access::Blocked => {
            tracing::warn!(target: "security", %ip, "Blocked request from banned IP");
            state.metrics.inc_blocked_requests();
            (StatusCode::FORBIDDEN, Json(error_body(StatusCode::FORBIDDEN, "ACCESS_DENIED", "Access denied")))
                .into_response()
        }
        Access::TemporarilyBlocked { retry_after_seconds } => {
            tracing::warn!(target: "security", %ip, retry_after_seconds, "Blocked request from temporarily banned IP");
            state.metrics.inc_blocked_requests();
            let mut body =
                error_body(StatusCode::FORBIDDEN, "TEMPORARILY_BLOCKED", "Access temporarily denied");
            body["retry_after_seconds"] = retry_after_seconds.into();
            let mut res = (StatusCode::FORBIDDEN, Json(body)).into_response();
            if let Ok(v) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                res.headers_mut().insert(RETRY_AFTER, v);
            }
            res
        }
    }
}
