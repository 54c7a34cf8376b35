use axum::{extract::State, routing::get, Json, Router};
use tax_optimizer::{InvestorProfile, TaxError};

use crate::{ApiResponse, AppError, AppState};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/api/profile", get(get_profile).put(put_profile))
}

async fn get_profile(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<InvestorProfile>>, AppError> {
    let profile = state.profile.get().await?.ok_or(TaxError::MissingProfile)?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn put_profile(
    State(state): State<AppState>,
    Json(profile): Json<InvestorProfile>,
) -> Result<Json<ApiResponse<InvestorProfile>>, AppError> {
    let saved = state.profile.put(&profile).await?;
    Ok(Json(ApiResponse::success(saved)))
}
