use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use portfolio_manager::{DataSnapshot, ImportReport};

use crate::{ApiResponse, AppError, AppState};

pub fn snapshot_routes() -> Router<AppState> {
    Router::new()
        .route("/api/export", get(export_snapshot))
        .route("/api/import", post(import_snapshot))
}

async fn export_snapshot(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DataSnapshot>>, AppError> {
    let snapshot = state.snapshots.export().await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

/// Replace all stored data with the uploaded snapshot
async fn import_snapshot(
    State(state): State<AppState>,
    Json(snapshot): Json<DataSnapshot>,
) -> Result<Json<ApiResponse<ImportReport>>, AppError> {
    let report = state.snapshots.import(snapshot).await?;
    Ok(Json(ApiResponse::success(report)))
}
