//! HTTP route handlers for the storefront API.
//!
//! Everything here is mounted under `/api` by [`crate::build_router`] and sits
//! behind the security pipeline. The operational endpoints in [`health`] are
//! merged separately and bypass it.
//!
//! - `products`: catalog browsing and search
//! - `cart`: session-keyed cart (`x-session-id`)
//! - `admin`: login and product management (`admin-session`)
//! - `security`: public security status report
//! - `recommendations`: sleep-style advice and "complete the set" pairings

pub mod admin;
pub mod cart;
pub mod health;
pub mod products;
pub mod recommendations;
pub mod security;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    routing::{get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor that answers malformed payloads with the API error envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(e) => AppError::BadRequest(format!("Invalid request data: {}", e.body_text())),
        JsonRejection::JsonSyntaxError(_) => AppError::BadRequest("Malformed JSON body".to_string()),
        JsonRejection::MissingJsonContentType(_) => {
            AppError::BadRequest("Content-Type must be application/json".to_string())
        }
        other => AppError::BadRequest(other.body_text()),
    }
}

async fn api_not_found() -> AppError {
    AppError::NotFound("API endpoint not found".to_string())
}

/// Routes served under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list_products))
        .route("/products/featured", get(products::featured_products))
        .route("/products/search", get(products::search_products))
        .route("/products/category/{category}", get(products::products_by_category))
        .route("/products/{id}", get(products::get_product))
        .route("/cart", get(cart::get_cart).post(cart::add_to_cart).delete(cart::clear_cart))
        .route("/cart/{id}", put(cart::update_cart_item).delete(cart::remove_cart_item))
        .route("/security/status", get(security::security_status))
        .route("/recommendations", get(recommendations::sleep_recommendation))
        .route("/recommendations/pairing/{product_id}", get(recommendations::pairing_recommendation))
        .route("/admin/login", post(admin::login))
        .route("/admin/logout", post(admin::logout))
        .route("/admin/products", post(admin::create_product))
        .route("/admin/products/{id}", put(admin::update_product).delete(admin::delete_product))
        .route("/admin/security/status", get(admin::security_status))
        .fallback(api_not_found)
}
