use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use portfolio_manager::{Portfolio, PortfolioInput};

use crate::{ApiResponse, AppError, AppState};

pub fn portfolio_routes() -> Router<AppState> {
    Router::new()
        .route("/api/portfolios", get(list_portfolios).post(create_portfolio))
        .route(
            "/api/portfolios/:id",
            get(get_portfolio).put(update_portfolio).delete(delete_portfolio),
        )
}

async fn list_portfolios(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Portfolio>>>, AppError> {
    let portfolios = state.portfolios.list_portfolios().await?;
    Ok(Json(ApiResponse::success(portfolios)))
}

async fn create_portfolio(
    State(state): State<AppState>,
    Json(req): Json<PortfolioInput>,
) -> Result<Json<ApiResponse<Portfolio>>, AppError> {
    let portfolio = state.portfolios.create_portfolio(req).await?;
    Ok(Json(ApiResponse::success(portfolio)))
}

async fn get_portfolio(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Portfolio>>, AppError> {
    let portfolio = state.portfolios.require_portfolio(id).await?;
    Ok(Json(ApiResponse::success(portfolio)))
}

async fn update_portfolio(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<PortfolioInput>,
) -> Result<Json<ApiResponse<Portfolio>>, AppError> {
    let portfolio = state.portfolios.update_portfolio(id, req).await?;
    Ok(Json(ApiResponse::success(portfolio)))
}

async fn delete_portfolio(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    state.portfolios.delete_portfolio(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "deleted": id }))))
}
