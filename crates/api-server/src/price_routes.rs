use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use portfolio_manager::{PriceQuote, PriceUpdate, StoreError};
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct SetPriceRequest {
    pub price: f64,
}

pub fn price_routes() -> Router<AppState> {
    Router::new()
        .route("/api/prices", get(list_prices))
        .route("/api/prices/bulk", post(bulk_update_prices))
        .route("/api/prices/:ticker", get(get_price).put(set_price))
}

async fn list_prices(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PriceQuote>>>, AppError> {
    let quotes = state.prices.list_prices().await?;
    Ok(Json(ApiResponse::success(quotes)))
}

async fn get_price(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ApiResponse<PriceQuote>>, AppError> {
    let quote = state
        .prices
        .get_price(&ticker)
        .await?
        .ok_or_else(|| StoreError::not_found("price", ticker.to_uppercase()))?;

    Ok(Json(ApiResponse::success(quote)))
}

async fn set_price(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Json(req): Json<SetPriceRequest>,
) -> Result<Json<ApiResponse<PriceQuote>>, AppError> {
    let quote = state.prices.set_price(&ticker, req.price).await?;
    Ok(Json(ApiResponse::success(quote)))
}

async fn bulk_update_prices(
    State(state): State<AppState>,
    Json(updates): Json<Vec<PriceUpdate>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let updated = state.prices.set_prices(updates).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "updated": updated }))))
}
