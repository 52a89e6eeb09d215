//! Session-keyed cart.
//!
//! The `x-session-id` header is an opaque client token, not an identity. Reads
//! and additions mint one when it is missing and hand it back in the response
//! header; updates and removals require it so they stay scoped to one cart.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::{parse_id, AppError, AppResult, OptionExt},
    routes::JsonBody,
    state::AppState,
    store::{admins::generate_token, CartRepository, ProductRepository},
    types::{validate_quantity, AddToCartRequest, UpdateCartRequest},
};

pub const SESSION_HEADER: &str = "x-session-id";
pub const MAX_SESSION_ID_LEN: usize = 128;
const GENERATED_SESSION_LEN: usize = 32;

/// Reads `x-session-id`. Blank counts as absent.
pub fn session_from_headers(headers: &HeaderMap) -> AppResult<Option<String>> {
    let Some(raw) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    let value = raw
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid session ID".to_string()))?
        .trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.len() > MAX_SESSION_ID_LEN {
        return Err(AppError::BadRequest(format!(
            "Session ID must be at most {} characters",
            MAX_SESSION_ID_LEN
        )));
    }
    Ok(Some(value.to_string()))
}

fn required_session(headers: &HeaderMap) -> AppResult<String> {
    session_from_headers(headers)?.ok_or_else(|| AppError::BadRequest("Session ID required".to_string()))
}

/// Existing session, or a fresh one flagged for the response header.
fn session_or_new(headers: &HeaderMap) -> AppResult<(String, bool)> {
    Ok(match session_from_headers(headers)? {
        Some(id) => (id, false),
        None => (generate_token(GENERATED_SESSION_LEN), true),
    })
}

fn with_session_header(mut res: Response, session_id: &str, fresh: bool) -> Response {
    if fresh {
        if let Ok(v) = HeaderValue::from_str(session_id) {
            res.headers_mut().insert(HeaderName::from_static(SESSION_HEADER), v);
        }
    }
    res
}

pub async fn get_cart(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let (session_id, fresh) = session_or_new(&headers)?;
    let items = CartRepository::new(&state.db).items_for_session(&session_id).await?;
    Ok(with_session_header(Json(items).into_response(), &session_id, fresh))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<AddToCartRequest>,
) -> AppResult<Response> {
    let (session_id, fresh) = session_or_new(&headers)?;
    let quantity = validate_quantity(req.quantity.unwrap_or(1))?;

    ProductRepository::new(&state.db).find_by_id(req.product_id).await?.ok_or_not_found("Product")?;

    let item = CartRepository::new(&state.db).add(&session_id, req.product_id, quantity).await?;
    state.metrics.inc_cart_additions();
    tracing::debug!(product_id = item.product_id, quantity = item.quantity, "Cart item added");

    let res = (StatusCode::CREATED, Json(item)).into_response();
    Ok(with_session_header(res, &session_id, fresh))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateCartRequest>,
) -> AppResult<Response> {
    let id = parse_id(&id, "Invalid cart item ID")?;
    let session_id = required_session(&headers)?;
    let quantity = validate_quantity(req.quantity)?;

    let item = CartRepository::new(&state.db)
        .update_quantity(&session_id, id, quantity)
        .await?
        .ok_or_not_found("Cart item")?;
    Ok(Json(item).into_response())
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "Invalid cart item ID")?;
    let session_id = required_session(&headers)?;

    if !CartRepository::new(&state.db).remove(&session_id, id).await? {
        return Err(AppError::NotFound("Cart item not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_cart(State(state): State<AppState>, headers: HeaderMap) -> AppResult<StatusCode> {
    let session_id = required_session(&headers)?;
    let removed = CartRepository::new(&state.db).clear(&session_id).await?;
    tracing::debug!(removed, "Cart cleared");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_header_rules() {
        let mut h = HeaderMap::new();
        assert_eq!(session_from_headers(&h).unwrap(), None);

        h.insert(SESSION_HEADER, HeaderValue::from_static("   "));
        assert_eq!(session_from_headers(&h).unwrap(), None);
        assert!(required_session(&h).is_err());

        h.insert(SESSION_HEADER, HeaderValue::from_static(" abc123 "));
        assert_eq!(session_from_headers(&h).unwrap().as_deref(), Some("abc123"));

        h.insert(SESSION_HEADER, HeaderValue::from_str(&"x".repeat(129)).unwrap());
        assert!(session_from_headers(&h).is_err());
    }

    #[test]
    fn fresh_sessions_are_echoed() {
        let (id, fresh) = session_or_new(&HeaderMap::new()).unwrap();
        assert!(fresh);
        assert_eq!(id.len(), GENERATED_SESSION_LEN);

        let res = with_session_header(StatusCode::OK.into_response(), &id, fresh);
        assert_eq!(res.headers().get(SESSION_HEADER).unwrap(), id.as_str());

        let res = with_session_header(StatusCode::OK.into_response(), "known", false);
        assert!(res.headers().get(SESSION_HEADER).is_none());
    }
}
