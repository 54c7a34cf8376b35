//! Tax Optimizer
//!
//! Tax-aware break-even analysis of open lots: the capital-gains tax owed if
//! sold today, the price decline that makes selling tax-neutral, and a
//! hold / monitor / sell recommendation, plus portfolio and per-ticker
//! aggregation. Everything here is pure and synchronous.

pub mod aggregator;
pub mod break_even;
pub mod error;
pub mod harvester;
pub mod lot;
pub mod profile;
pub mod tax_calculator;
pub mod tax_tables;

pub use aggregator::{
    PortfolioAggregator, PortfolioBreakEven, PortfolioSummary, RecommendationCounts,
    RiskDistribution, TickerSummary,
};
pub use break_even::{
    BracketWalkSolver, BreakEvenAnalysis, BreakEvenDetail, BreakEvenEngine, BreakEvenInput,
    BreakEvenSolver, FinancialAnalysis, HoldingPeriodInfo, MarginalRateSolver, PositionStatus,
    Recommendation, RiskLevel, TaxAnalysis, CONSIDER_SELLING_BELOW_PCT, HOLD_AT_OR_ABOVE_PCT,
};
pub use error::{TaxError, TaxResult};
pub use harvester::{HarvestEstimate, LossOffsetPolicy, ANNUAL_LOSS_LIMIT, MARRIED_SEPARATE_LOSS_LIMIT};
pub use lot::{normalize_ticker, HoldingPeriod, Lot, TransactionType, LONG_TERM_THRESHOLD_DAYS};
pub use profile::{FilingStatus, InvestorProfile};
pub use tax_calculator::{AnalysisWarning, TaxBreakdown, TaxCalculator, TaxRates};
