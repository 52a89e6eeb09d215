use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::ip::client_ip;
use crate::monitor::Escalation;
use crate::state::AppState;

/// Feeds every response status that reaches this layer into the monitor.
pub async fn track_suspicious_activity(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req, state.config.security.trust_proxy_hops);
    let res = next.run(req).await;

    match state.monitor.record_outcome(ip, res.status().as_u16()).await {
        Escalation::TemporaryBan => state.metrics.inc_temporary_bans(),
        Escalation::PermanentBan => state.metrics.inc_permanent_bans(),
        Escalation::None => {}
    }
    res
}
