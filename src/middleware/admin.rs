//! Admin session guard.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::store::AdminRepository;
use crate::types::Admin;

pub const ADMIN_SESSION_HEADER: &str = "admin-session";

/// Session token sent by the admin panel, if any.
pub fn session_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(ADMIN_SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Extractor that resolves the `admin-session` header to an active admin.
///
/// Rejects with `401` when the header is missing or the session is unknown,
/// expired or belongs to a deactivated account.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Admin);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = session_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Admin authentication required".to_string()))?;

        match AdminRepository::new(&state.db).find_by_session(token).await? {
            Some(admin) => Ok(RequireAdmin(admin)),
            None => Err(AppError::Unauthorized("Invalid admin session".to_string())),
        }
    }
}
