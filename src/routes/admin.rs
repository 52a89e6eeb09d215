use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    error::{parse_id, AppError, AppResult, OptionExt},
    middleware::{
        admin::ADMIN_SESSION_HEADER,
        ip::{extract_ip_from_headers, MaybeRemoteAddr},
        validation::sanitize_for_logging,
        RequireAdmin,
    },
    monitor::{SecurityStatus, StatusView},
    routes::JsonBody,
    state::AppState,
    store::{AdminRepository, ProductRepository},
    types::{LoginRequest, LoginResponse, NewProduct, Product, ProductPatch},
};

pub async fn login(
    State(state): State<AppState>,
    MaybeRemoteAddr(remote): MaybeRemoteAddr,
    headers: HeaderMap,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let username = req.username.as_deref().map(str::trim).filter(|u| !u.is_empty());
    let password = req.password.as_deref().filter(|p| !p.is_empty());
    let (Some(username), Some(password)) = (username, password) else {
        return Err(AppError::BadRequest("Username and password required".to_string()));
    };

    let admins = AdminRepository::new(&state.db);
    let Some(admin) = admins.verify_credentials(username, password).await? else {
        state.metrics.inc_admin_login_failures();
        let ip = extract_ip_from_headers(&headers, remote.map(|a| a.ip()), state.config.security.trust_proxy_hops);
        tracing::warn!(
            target: "security",
            %ip,
            username = %sanitize_for_logging(username),
            "Failed admin login"
        );
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    };

    let session_id = admins.create_session(admin.id, state.config.admin.session_ttl()).await?;
    state.metrics.inc_admin_logins();
    tracing::info!(target: "security", admin_id = admin.id, "Admin logged in");

    Ok(Json(LoginResponse { success: true, session_id, admin: admin.into() }))
}

/// Always succeeds; an unknown or missing session is simply ignored.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let token = headers
        .get(ADMIN_SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = token {
        if AdminRepository::new(&state.db).delete_session(token).await? {
            tracing::info!(target: "security", "Admin logged out");
        }
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(req): JsonBody<NewProduct>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = ProductRepository::new(&state.db).create(&req.validated()?).await?;
    tracing::info!(admin_id = admin.id, product_id = product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<ProductPatch>,
) -> AppResult<Json<Product>> {
    let id = parse_id(&id, "Invalid product ID")?;
    let repo = ProductRepository::new(&state.db);
    let current = repo.find_by_id(id).await?.ok_or_not_found("Product")?;
    if patch.is_empty() {
        return Ok(Json(current));
    }

    let updated = repo.update(&patch.apply_to(current)?).await?.ok_or_not_found("Product")?;
    tracing::info!(admin_id = admin.id, product_id = id, "Product updated");
    Ok(Json(updated))
}

pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id, "Invalid product ID")?;
    if !ProductRepository::new(&state.db).delete(id).await? {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    tracing::info!(admin_id = admin.id, product_id = id, "Product deleted");
    Ok(Json(json!({ "success": true })))
}

/// Unmasked security report with the longer admin lists.
pub async fn security_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Json<SecurityStatus> {
    Json(state.monitor.snapshot(StatusView::Admin).await)
}
