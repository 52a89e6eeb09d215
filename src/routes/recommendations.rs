use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::{parse_id, AppError, AppResult, OptionExt},
    recommend::{pairing_for, PairingRecommendation, SleepRecommendation, SleepStyle, RECOMMENDATION_LIMIT},
    state::AppState,
    store::ProductRepository,
    types::Category,
};

#[derive(Debug, Deserialize)]
pub struct SleepQuery {
    pub sleep: Option<String>,
}

pub async fn sleep_recommendation(
    State(state): State<AppState>,
    Query(q): Query<SleepQuery>,
) -> AppResult<Json<SleepRecommendation>> {
    let style: SleepStyle = q
        .sleep
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Sleep preference is required (hot, cool or balanced)".to_string()))?
        .parse()
        .map_err(|_| AppError::BadRequest("Sleep preference must be one of: hot, cool, balanced".to_string()))?;

    let products = ProductRepository::new(&state.db)
        .recommend(Category::Bedsheets, style.preferred_materials(), None, RECOMMENDATION_LIMIT)
        .await?;

    Ok(Json(SleepRecommendation {
        sleep_type: style,
        message: style.message(),
        category: Category::Bedsheets,
        products,
    }))
}

pub async fn pairing_recommendation(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> AppResult<Json<PairingRecommendation>> {
    let product_id = parse_id(&product_id, "Invalid product ID")?;
    let repo = ProductRepository::new(&state.db);
    let product = repo.find_by_id(product_id).await?.ok_or_not_found("Product")?;

    let (category, message) = pairing_for(product.category);
    let products = repo.recommend(category, &[], Some(product.id), RECOMMENDATION_LIMIT).await?;

    Ok(Json(PairingRecommendation { product_id: product.id, message, category, products }))
}
