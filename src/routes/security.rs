use axum::{extract::State, Json};

use crate::monitor::{SecurityStatus, StatusView};
use crate::state::AppState;

/// Public report: masked addresses, short lists.
pub async fn security_status(State(state): State<AppState>) -> Json<SecurityStatus> {
    Json(state.monitor.snapshot(StatusView::Public).await)
}
