use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use portfolio_manager::{Transaction, TransactionInput};
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct TransactionsQuery {
    pub portfolio_id: Option<i64>,
}

pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/api/transactions", get(list_transactions).post(create_transaction))
        .route(
            "/api/transactions/:id",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
}

async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, AppError> {
    let transactions = match query.portfolio_id {
        Some(portfolio_id) => {
            state.portfolios.require_portfolio(portfolio_id).await?;
            state.transactions.transactions_for_portfolio(portfolio_id).await?
        }
        None => state.transactions.list_transactions().await?,
    };

    Ok(Json(ApiResponse::success(transactions)))
}

async fn create_transaction(
    State(state): State<AppState>,
    Json(req): Json<TransactionInput>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let transaction = state.transactions.create_transaction(req).await?;
    Ok(Json(ApiResponse::success(transaction)))
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let transaction = state.transactions.require_transaction(id).await?;
    Ok(Json(ApiResponse::success(transaction)))
}

async fn update_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<TransactionInput>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let transaction = state.transactions.update_transaction(id, req).await?;
    Ok(Json(ApiResponse::success(transaction)))
}

async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    state.transactions.delete_transaction(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "deleted": id }))))
}
