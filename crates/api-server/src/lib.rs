//! Break-even REST server.
//!
//! Thin axum layer over the SQLite store and the pure break-even engine.
//! Every analysis request reloads lots, prices and the profile.

pub mod break_even_routes;
pub mod config;
pub mod portfolio_routes;
pub mod price_routes;
pub mod profile_routes;
pub mod request_id;
pub mod snapshot_routes;
pub mod transaction_routes;

use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use portfolio_manager::{
    PortfolioDb, PortfolioManager, PriceBook, ProfileRepository, SnapshotService,
    SqliteProfileRepository, StoreError, TransactionLog,
};
use serde::Serialize;
use std::sync::Arc;
use tax_optimizer::{BracketWalkSolver, BreakEvenEngine, MarginalRateSolver, TaxError};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{ServerConfig, SolverKind};

#[derive(Clone)]
pub struct AppState {
    pub portfolios: Arc<PortfolioManager>,
    pub transactions: Arc<TransactionLog>,
    pub prices: Arc<PriceBook>,
    pub profile: Arc<dyn ProfileRepository>,
    pub snapshots: Arc<SnapshotService>,
    pub engine: Arc<BreakEvenEngine>,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error; the status comes from the typed error inside.
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<TaxError>() {
            return match err {
                TaxError::MissingProfile => StatusCode::NOT_FOUND,
                TaxError::InvalidInput(_) | TaxError::UnknownStateCode(_) => StatusCode::BAD_REQUEST,
            };
        }
        if let Some(err) = self.0.downcast_ref::<StoreError>() {
            return match err {
                StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
            };
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }

        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

/// Open the database and wire the services
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let db = PortfolioDb::new(&config.database_url).await?;

    let engine = match config.solver {
        SolverKind::MarginalRate => BreakEvenEngine::with_solver(MarginalRateSolver),
        SolverKind::BracketWalk => BreakEvenEngine::with_solver(BracketWalkSolver),
    };
    tracing::info!(solver = engine.solver_name(), "break-even engine ready");

    Ok(AppState {
        portfolios: Arc::new(PortfolioManager::new(db.clone())),
        transactions: Arc::new(TransactionLog::new(db.clone())),
        prices: Arc::new(PriceBook::new(db.clone())),
        profile: Arc::new(SqliteProfileRepository::new(db.clone())),
        snapshots: Arc::new(SnapshotService::new(db)),
        engine: Arc::new(engine),
    })
}

pub fn app_router(state: AppState, config: &ServerConfig) -> Router {
    let cors = if config.cors_allowed_origins.is_empty()
        || config.cors_allowed_origins.iter().any(|o| o == "*")
    {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    Router::new()
        .route("/health", get(health))
        .merge(portfolio_routes::portfolio_routes())
        .merge(transaction_routes::transaction_routes())
        .merge(price_routes::price_routes())
        .merge(profile_routes::profile_routes())
        .merge(break_even_routes::break_even_routes())
        .merge(snapshot_routes::snapshot_routes())
        .with_state(state)
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(trace)
        .layer(cors)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "breakeven-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    let state = build_state(&config).await?;
    let app = app_router(state, &config);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "break-even API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let missing: AppError = StoreError::not_found("portfolio", 7).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let invalid: AppError = TaxError::InvalidInput("bad".into()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let no_profile: AppError = TaxError::MissingProfile.into();
        assert_eq!(no_profile.status(), StatusCode::NOT_FOUND);

        let other: AppError = anyhow::anyhow!("disk full").into();
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_context_keeps_status() {
        let err = anyhow::Error::from(StoreError::Invalid("negative".into())).context("saving price");
        assert_eq!(AppError::from(err).status(), StatusCode::BAD_REQUEST);
    }
}
