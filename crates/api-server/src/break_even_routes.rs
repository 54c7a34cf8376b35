//! Break-even analysis endpoints.
//!
//! Single lots, whole portfolios, one ticker across portfolios, and ad hoc
//! lots that are never stored.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use portfolio_manager::{open_lots, Portfolio, StoreError, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tax_optimizer::{
    BreakEvenAnalysis, InvestorProfile, Lot, PortfolioAggregator, PortfolioBreakEven,
    PortfolioSummary, TaxError, TickerSummary, TransactionType,
};

use crate::{ApiResponse, AppError, AppState};

/// Request to analyze a lot that is not in storage
#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub ticker: String,
    pub quantity: f64,
    pub price_per_share: f64,
    pub transaction_date: NaiveDate,
    pub current_price: f64,
    /// Evaluate against this profile instead of the stored one
    pub profile: Option<InvestorProfile>,
    pub as_of: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct PortfolioBreakEvenResponse {
    pub portfolio: Portfolio,
    pub summary: PortfolioSummary,
    pub by_ticker: Vec<TickerSummary>,
    pub positions: Vec<BreakEvenAnalysis>,
}

#[derive(Serialize)]
pub struct TickerBreakEvenResponse {
    pub ticker: String,
    /// Absent when there is no profile or no priced open lot
    pub summary: Option<TickerSummary>,
    pub totals: PortfolioSummary,
    pub positions: Vec<BreakEvenAnalysis>,
}

pub fn break_even_routes() -> Router<AppState> {
    Router::new()
        .route("/api/break-even/transactions/:id", get(analyze_transaction))
        .route("/api/break-even/portfolios/:id", get(analyze_portfolio))
        .route("/api/break-even/tickers/:ticker", get(analyze_ticker))
        .route("/api/break-even/analyze", post(analyze_ad_hoc))
}

/// Analyze what is still open of one stored buy, after FIFO sells
async fn analyze_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<BreakEvenAnalysis>>, AppError> {
    let transaction = state.transactions.require_transaction(id).await?;
    if transaction.kind()? != TransactionType::Buy {
        return Err(TaxError::InvalidInput(format!(
            "transaction {} is a sell; only buy lots can be analyzed",
            id
        ))
        .into());
    }

    let history = state
        .transactions
        .transactions_for_portfolio(transaction.portfolio_id)
        .await?;
    let lot = open_lots(&history)?
        .into_iter()
        .find(|lot| lot.id == Some(id))
        .ok_or_else(|| StoreError::not_found("open lot", id))?;

    let profile = state.profile.get().await?.ok_or(TaxError::MissingProfile)?;
    let quote = state
        .prices
        .get_price(&lot.ticker)
        .await?
        .ok_or_else(|| StoreError::not_found("price", &lot.ticker))?;

    let analysis = state.engine.analyze(&lot, quote.price, &profile)?;
    Ok(Json(ApiResponse::success(analysis)))
}

async fn analyze_portfolio(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<PortfolioBreakEvenResponse>>, AppError> {
    let portfolio = state.portfolios.require_portfolio(id).await?;
    let transactions = state.transactions.transactions_for_portfolio(id).await?;
    let lots = open_lots(&transactions)?;

    let profile = state.profile.get().await?;
    let result = aggregate(&state, &lots, portfolio.cash_on_hand, profile.as_ref()).await?;
    let by_ticker = match &profile {
        Some(profile) => PortfolioAggregator::new(&state.engine)
            .summarize_by_ticker(&result.positions, profile),
        None => Vec::new(),
    };

    tracing::info!(
        portfolio_id = id,
        lots = result.summary.lots_analyzed,
        profile_available = result.summary.profile_available,
        "portfolio break-even computed"
    );

    Ok(Json(ApiResponse::success(PortfolioBreakEvenResponse {
        portfolio,
        summary: result.summary,
        by_ticker,
        positions: result.positions,
    })))
}

/// One ticker across every portfolio; FIFO matching stays per portfolio
async fn analyze_ticker(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ApiResponse<TickerBreakEvenResponse>>, AppError> {
    let ticker = tax_optimizer::normalize_ticker(&ticker)?;
    let transactions = state.transactions.transactions_for_ticker(&ticker).await?;

    let mut by_portfolio: BTreeMap<i64, Vec<Transaction>> = BTreeMap::new();
    for tx in transactions {
        by_portfolio.entry(tx.portfolio_id).or_default().push(tx);
    }
    let mut lots = Vec::new();
    for history in by_portfolio.values() {
        lots.extend(open_lots(history)?);
    }

    let profile = state.profile.get().await?;
    let result = aggregate(&state, &lots, 0.0, profile.as_ref()).await?;
    let summary = match &profile {
        Some(profile) => PortfolioAggregator::new(&state.engine)
            .summarize_by_ticker(&result.positions, profile)
            .into_iter()
            .next(),
        None => None,
    };

    Ok(Json(ApiResponse::success(TickerBreakEvenResponse {
        ticker,
        summary,
        totals: result.summary,
        positions: result.positions,
    })))
}

async fn analyze_ad_hoc(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<BreakEvenAnalysis>>, AppError> {
    let profile = match req.profile {
        Some(profile) => profile,
        None => state.profile.get().await?.ok_or(TaxError::MissingProfile)?,
    };

    let ticker = tax_optimizer::normalize_ticker(&req.ticker)?;
    let lot = Lot::buy(ticker, req.quantity, req.price_per_share, req.transaction_date);
    let as_of = req.as_of.unwrap_or_else(|| Utc::now().date_naive());

    let analysis = state
        .engine
        .analyze_as_of(&lot, req.current_price, &profile, as_of)?;
    Ok(Json(ApiResponse::success(analysis)))
}

/// The caller reads the profile once so every part of a response shares it
async fn aggregate(
    state: &AppState,
    lots: &[Lot],
    cash_on_hand: f64,
    profile: Option<&InvestorProfile>,
) -> anyhow::Result<PortfolioBreakEven> {
    let prices = state.prices.price_map().await?;

    let result = PortfolioAggregator::new(&state.engine).aggregate(
        lots,
        &prices,
        profile,
        cash_on_hand,
        Utc::now().date_naive(),
    )?;

    Ok(result)
}
