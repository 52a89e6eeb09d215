use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::{parse_id, AppError, AppResult, OptionExt},
    state::AppState,
    store::ProductRepository,
    types::{Product, SearchQuery},
};

pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(ProductRepository::new(&state.db).list_all().await?))
}

pub async fn featured_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(ProductRepository::new(&state.db).list_featured().await?))
}

/// Unknown categories yield an empty list rather than an error.
pub async fn products_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(ProductRepository::new(&state.db).list_by_category(&category).await?))
}

pub async fn search_products(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let term = q.q.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let Some(term) = term else {
        return Err(AppError::BadRequest("Search query is required".to_string()));
    };
    if term.chars().count() > 100 {
        return Err(AppError::BadRequest("Search query is too long".to_string()));
    }
    Ok(Json(ProductRepository::new(&state.db).search(term).await?))
}

pub async fn get_product(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Product>> {
    let id = parse_id(&id, "Invalid product ID")?;
    let product = ProductRepository::new(&state.db).find_by_id(id).await?.ok_or_not_found("Product")?;
    Ok(Json(product))
}
