//! Break-Even Engine
//!
//! Tax owed if a lot were sold today, the price decline that would make
//! holding no better than selling, and the resulting recommendation.

use crate::error::{TaxError, TaxResult};
use crate::harvester::{HarvestEstimate, LossOffsetPolicy};
use crate::lot::{HoldingPeriod, Lot, TransactionType};
use crate::profile::InvestorProfile;
use crate::tax_calculator::{AnalysisWarning, TaxCalculator, TaxRates};
use crate::tax_tables::{long_term_brackets, ordinary_brackets, stacked_tax};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Gains needing less than this decline (percent) should be considered for sale
pub const CONSIDER_SELLING_BELOW_PCT: f64 = 5.0;

/// Gains needing at least this decline (percent) are held
pub const HOLD_AT_OR_ABOVE_PCT: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Gain,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Hold,
    MonitorClosely,
    ConsiderSelling,
}

impl Recommendation {
    /// Bucket a gain by the decline it can absorb
    pub fn from_loss_required(loss_required_percentage: f64) -> Self {
        if loss_required_percentage < CONSIDER_SELLING_BELOW_PCT {
            Self::ConsiderSelling
        } else if loss_required_percentage < HOLD_AT_OR_ABOVE_PCT {
            Self::MonitorClosely
        } else {
            Self::Hold
        }
    }
}

/// Risk of a gain evaporating before selling becomes worthwhile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn from_loss_required(loss_required_percentage: f64) -> Self {
        match Recommendation::from_loss_required(loss_required_percentage) {
            Recommendation::ConsiderSelling => Self::High,
            Recommendation::MonitorClosely => Self::Medium,
            Recommendation::Hold => Self::Low,
        }
    }
}

/// Everything a solver needs to price the sale of a gain
#[derive(Debug, Clone, Copy)]
pub struct BreakEvenInput<'a> {
    pub profile: &'a InvestorProfile,
    pub holding_period: HoldingPeriod,
    pub rates: &'a TaxRates,
    pub quantity: f64,
    pub current_price: f64,
    pub gain: f64,
}

impl BreakEvenInput<'_> {
    pub fn current_value(&self) -> f64 {
        self.quantity * self.current_price
    }
}

/// Strategy for the tax a sale would trigger, and so the break-even decline
pub trait BreakEvenSolver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Tax owed if the position were sold at the current price
    fn tax_at_sale(&self, input: &BreakEvenInput<'_>) -> f64;

    /// Percentage decline at which holding is no better than selling now
    fn solve(&self, input: &BreakEvenInput<'_>) -> BreakEvenDetail {
        let value = input.current_value();
        let tax = self.tax_at_sale(input).max(0.0);

        let loss_required_percentage = if value > 0.0 {
            (tax / value * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        BreakEvenDetail {
            loss_required_percentage,
            break_even_price: input.current_price * (1.0 - loss_required_percentage / 100.0),
            solver: self.name().to_string(),
        }
    }
}

/// Applies the combined marginal rate at the household-income bracket to the
/// whole gain. Brackets are not re-evaluated across the span of the gain, so
/// a gain large enough to cross a threshold is slightly under-taxed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarginalRateSolver;

impl BreakEvenSolver for MarginalRateSolver {
    fn name(&self) -> &'static str {
        "marginal_rate"
    }

    fn tax_at_sale(&self, input: &BreakEvenInput<'_>) -> f64 {
        input.gain.max(0.0) * input.rates.combined()
    }
}

/// Stacks the gain on top of household income and walks every federal
/// bracket it spans. State and local rates stay flat.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketWalkSolver;

impl BreakEvenSolver for BracketWalkSolver {
    fn name(&self) -> &'static str {
        "bracket_walk"
    }

    fn tax_at_sale(&self, input: &BreakEvenInput<'_>) -> f64 {
        let gain = input.gain.max(0.0);
        let brackets = match input.holding_period {
            HoldingPeriod::ShortTerm => ordinary_brackets(input.profile.filing_status),
            HoldingPeriod::LongTerm => long_term_brackets(input.profile.filing_status),
        };

        let federal = stacked_tax(brackets, input.profile.annual_household_income, gain);
        federal + gain * (input.rates.state + input.rates.local)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingPeriodInfo {
    pub classification: HoldingPeriod,
    pub days_held: i64,
    pub days_until_long_term: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialAnalysis {
    pub cost_basis: f64,
    pub current_value: f64,
    pub current_gain_loss: f64,
    pub gain_loss_percentage: f64,
}

/// Rates are the marginal rates at household income. The taxes come from the
/// engine's solver, so `total_tax_owed` is always `p * current_value / 100`
/// for the reported loss-required percentage `p`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxAnalysis {
    pub federal_rate: f64,
    pub state_rate: f64,
    pub local_rate: f64,
    pub combined_rate: f64,
    pub federal_tax: f64,
    pub state_tax: f64,
    pub local_tax: f64,
    pub total_tax_owed: f64,
    pub after_tax_proceeds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakEvenDetail {
    /// Decline from the current price, in percent, clamped to [0, 100]
    pub loss_required_percentage: f64,
    pub break_even_price: f64,
    pub solver: String,
}

/// Full tax and break-even analysis of one lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakEvenAnalysis {
    pub lot_id: Option<i64>,
    pub ticker: String,
    pub quantity: f64,
    pub price_per_share: f64,
    pub current_price: f64,
    pub transaction_date: NaiveDate,
    pub as_of: NaiveDate,
    pub position_status: PositionStatus,
    pub holding_period: HoldingPeriodInfo,
    pub financial_analysis: FinancialAnalysis,
    pub tax_analysis: TaxAnalysis,
    /// Present for gains only
    pub break_even_analysis: Option<BreakEvenDetail>,
    /// Present for losses only
    pub tax_loss_harvesting: Option<HarvestEstimate>,
    pub recommendation: Recommendation,
    pub warnings: Vec<AnalysisWarning>,
}

impl BreakEvenAnalysis {
    pub fn is_gain(&self) -> bool {
        self.position_status == PositionStatus::Gain
    }

    /// Break-even decline in percent, for gains
    pub fn loss_required_percentage(&self) -> Option<f64> {
        self.break_even_analysis
            .as_ref()
            .map(|b| b.loss_required_percentage)
    }
}

/// Stateless break-even analyzer
pub struct BreakEvenEngine {
    solver: Box<dyn BreakEvenSolver>,
    loss_policy: LossOffsetPolicy,
}

impl Default for BreakEvenEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakEvenEngine {
    /// Engine using the marginal-rate approximation
    pub fn new() -> Self {
        Self::with_solver(MarginalRateSolver)
    }

    pub fn with_solver(solver: impl BreakEvenSolver + 'static) -> Self {
        Self {
            solver: Box::new(solver),
            loss_policy: LossOffsetPolicy::default(),
        }
    }

    pub fn with_loss_policy(mut self, loss_policy: LossOffsetPolicy) -> Self {
        self.loss_policy = loss_policy;
        self
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    pub fn loss_policy(&self) -> &LossOffsetPolicy {
        &self.loss_policy
    }

    /// Analyze a lot as of today (UTC)
    pub fn analyze(
        &self,
        lot: &Lot,
        current_price: f64,
        profile: &InvestorProfile,
    ) -> TaxResult<BreakEvenAnalysis> {
        self.analyze_as_of(lot, current_price, profile, Utc::now().date_naive())
    }

    /// Analyze a lot as of a given date
    pub fn analyze_as_of(
        &self,
        lot: &Lot,
        current_price: f64,
        profile: &InvestorProfile,
        as_of: NaiveDate,
    ) -> TaxResult<BreakEvenAnalysis> {
        lot.validate()?;
        if lot.transaction_type != TransactionType::Buy {
            return Err(TaxError::InvalidInput(format!(
                "only buy lots can be analyzed, got a {} of {}",
                lot.transaction_type, lot.ticker
            )));
        }
        if !current_price.is_finite() || current_price < 0.0 {
            return Err(TaxError::InvalidInput(format!(
                "current price must be >= 0, got {}",
                current_price
            )));
        }
        let profile = profile.clone().validated()?;

        let cost_basis = lot.cost_basis();
        let current_value = lot.quantity * current_price;
        let gain_loss = current_value - cost_basis;
        let position_status = if gain_loss >= 0.0 {
            PositionStatus::Gain
        } else {
            PositionStatus::Loss
        };

        let holding_period = lot.holding_period(as_of);
        let calculator = TaxCalculator::new(&profile);
        let (rates, warning) = calculator.rates(holding_period);
        let mut breakdown = calculator.tax_on_gain(gain_loss, &rates);

        let (break_even_analysis, tax_loss_harvesting, recommendation) = match position_status {
            PositionStatus::Gain => {
                let input = BreakEvenInput {
                    profile: &profile,
                    holding_period,
                    rates: &rates,
                    quantity: lot.quantity,
                    current_price,
                    gain: gain_loss,
                };
                let detail = self.solver.solve(&input);
                // The solver's tax is the reported total; federal absorbs the difference.
                let total = self.solver.tax_at_sale(&input).max(0.0);
                breakdown.federal_tax = total - breakdown.state_tax - breakdown.local_tax;
                breakdown.total_tax_owed = total;
                let recommendation = Recommendation::from_loss_required(detail.loss_required_percentage);
                (Some(detail), None, recommendation)
            }
            PositionStatus::Loss => {
                let estimate =
                    self.loss_policy
                        .estimate(-gain_loss, profile.filing_status, &rates);
                (None, Some(estimate), Recommendation::ConsiderSelling)
            }
        };

        tracing::debug!(
            ticker = %lot.ticker,
            gain_loss,
            total_tax = breakdown.total_tax_owed,
            ?recommendation,
            "break-even analysis"
        );

        Ok(BreakEvenAnalysis {
            lot_id: lot.id,
            ticker: lot.ticker.clone(),
            quantity: lot.quantity,
            price_per_share: lot.price_per_share,
            current_price,
            transaction_date: lot.transaction_date,
            as_of,
            position_status,
            holding_period: HoldingPeriodInfo {
                classification: holding_period,
                days_held: lot.days_held(as_of),
                days_until_long_term: lot.days_until_long_term(as_of),
            },
            financial_analysis: FinancialAnalysis {
                cost_basis,
                current_value,
                current_gain_loss: gain_loss,
                gain_loss_percentage: gain_loss / cost_basis * 100.0,
            },
            tax_analysis: TaxAnalysis {
                federal_rate: rates.federal,
                state_rate: rates.state,
                local_rate: rates.local,
                combined_rate: rates.combined(),
                federal_tax: breakdown.federal_tax,
                state_tax: breakdown.state_tax,
                local_tax: breakdown.local_tax,
                total_tax_owed: breakdown.total_tax_owed,
                after_tax_proceeds: current_value - breakdown.total_tax_owed,
            },
            break_even_analysis,
            tax_loss_harvesting,
            recommendation,
            warnings: warning.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvester::ANNUAL_LOSS_LIMIT;
    use crate::profile::FilingStatus;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn short_term_lot(quantity: f64, price: f64) -> Lot {
        Lot::buy("ACME", quantity, price, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    }

    fn long_term_lot(quantity: f64, price: f64) -> Lot {
        Lot::buy("ACME", quantity, price, NaiveDate::from_ymd_opt(2022, 3, 1).unwrap())
    }

    fn ny_profile() -> InvestorProfile {
        InvestorProfile::new(300_000.0, FilingStatus::Single, "NY", 0.01)
    }

    #[test]
    fn test_unchanged_price_is_zero_gain() {
        let engine = BreakEvenEngine::new();
        let lot = short_term_lot(37.0, 12.34);
        let analysis = engine.analyze_as_of(&lot, 12.34, &ny_profile(), as_of()).unwrap();

        assert_eq!(analysis.financial_analysis.current_gain_loss, 0.0);
        assert_eq!(analysis.position_status, PositionStatus::Gain);
        assert_eq!(analysis.tax_analysis.total_tax_owed, 0.0);
        assert_eq!(analysis.loss_required_percentage(), Some(0.0));
    }

    #[test]
    fn test_new_york_scenario() {
        let engine = BreakEvenEngine::new();
        let lot = short_term_lot(100.0, 50.0);
        let analysis = engine.analyze_as_of(&lot, 70.0, &ny_profile(), as_of()).unwrap();

        assert!((analysis.financial_analysis.current_gain_loss - 2000.0).abs() < 1e-9);
        assert_eq!(analysis.position_status, PositionStatus::Gain);
        assert!(analysis.tax_analysis.total_tax_owed > 0.0);
        assert!(analysis.tax_analysis.state_tax > 0.0);
        let p = analysis.loss_required_percentage().unwrap();
        assert!(p > 0.0 && p < 100.0);
        assert!(analysis.tax_loss_harvesting.is_none());
    }

    #[test]
    fn test_florida_has_no_state_tax() {
        let engine = BreakEvenEngine::new();
        let lot = short_term_lot(100.0, 50.0);
        let ny = engine.analyze_as_of(&lot, 70.0, &ny_profile(), as_of()).unwrap();

        let fl_profile = InvestorProfile::new(300_000.0, FilingStatus::Single, "FL", 0.01);
        let fl = engine.analyze_as_of(&lot, 70.0, &fl_profile, as_of()).unwrap();

        assert_eq!(fl.tax_analysis.state_tax, 0.0);
        assert!(fl.tax_analysis.total_tax_owed < ny.tax_analysis.total_tax_owed);
    }

    #[test]
    fn test_marginal_solver_matches_tax_owed() {
        let engine = BreakEvenEngine::new();
        let lot = long_term_lot(40.0, 100.0);
        let analysis = engine.analyze_as_of(&lot, 180.0, &ny_profile(), as_of()).unwrap();

        let p = analysis.loss_required_percentage().unwrap();
        let implied_tax = p * analysis.financial_analysis.current_value / 100.0;
        assert!((implied_tax - analysis.tax_analysis.total_tax_owed).abs() < 1e-6);

        let detail = analysis.break_even_analysis.unwrap();
        assert_eq!(detail.solver, "marginal_rate");
        assert!((detail.break_even_price - 180.0 * (1.0 - p / 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_long_term_uses_capital_gains_rate() {
        let engine = BreakEvenEngine::new();
        let short = engine
            .analyze_as_of(&short_term_lot(100.0, 50.0), 70.0, &ny_profile(), as_of())
            .unwrap();
        let long = engine
            .analyze_as_of(&long_term_lot(100.0, 50.0), 70.0, &ny_profile(), as_of())
            .unwrap();

        assert_eq!(long.holding_period.classification, HoldingPeriod::LongTerm);
        assert_eq!(long.tax_analysis.federal_rate, 0.15);
        assert_eq!(short.tax_analysis.federal_rate, 0.35);
        assert!(long.tax_analysis.total_tax_owed < short.tax_analysis.total_tax_owed);
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(Recommendation::from_loss_required(0.0), Recommendation::ConsiderSelling);
        assert_eq!(Recommendation::from_loss_required(4.999), Recommendation::ConsiderSelling);
        assert_eq!(Recommendation::from_loss_required(5.0), Recommendation::MonitorClosely);
        assert_eq!(Recommendation::from_loss_required(14.999), Recommendation::MonitorClosely);
        assert_eq!(Recommendation::from_loss_required(15.0), Recommendation::Hold);
        assert_eq!(Recommendation::from_loss_required(100.0), Recommendation::Hold);

        assert_eq!(RiskLevel::from_loss_required(4.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_loss_required(5.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_loss_required(15.0), RiskLevel::Low);
    }

    #[test]
    fn test_loss_routes_to_harvest_estimate() {
        let engine = BreakEvenEngine::new();
        let lot = short_term_lot(100.0, 100.0);
        let profile = ny_profile();
        let analysis = engine.analyze_as_of(&lot, 20.0, &profile, as_of()).unwrap();

        assert_eq!(analysis.position_status, PositionStatus::Loss);
        assert_eq!(analysis.tax_analysis.total_tax_owed, 0.0);
        assert!(analysis.break_even_analysis.is_none());
        assert_eq!(analysis.recommendation, Recommendation::ConsiderSelling);

        let harvest = analysis.tax_loss_harvesting.unwrap();
        assert_eq!(harvest.unrealized_loss, 8_000.0);
        assert_eq!(harvest.deductible_loss, ANNUAL_LOSS_LIMIT);
        let max_savings = ANNUAL_LOSS_LIMIT * (0.35 + 0.109 + 0.01);
        assert!(harvest.estimated_savings <= max_savings + 1e-9);
    }

    #[test]
    fn test_zero_price_is_a_loss_not_an_error() {
        let engine = BreakEvenEngine::new();
        let analysis = engine
            .analyze_as_of(&short_term_lot(10.0, 5.0), 0.0, &ny_profile(), as_of())
            .unwrap();
        assert_eq!(analysis.position_status, PositionStatus::Loss);
        assert_eq!(analysis.financial_analysis.current_value, 0.0);
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        let engine = BreakEvenEngine::new();
        let profile = ny_profile();

        let zero_qty = short_term_lot(0.0, 10.0);
        assert!(matches!(
            engine.analyze_as_of(&zero_qty, 10.0, &profile, as_of()),
            Err(TaxError::InvalidInput(_))
        ));

        let zero_basis = short_term_lot(10.0, 0.0);
        assert!(matches!(
            engine.analyze_as_of(&zero_basis, 10.0, &profile, as_of()),
            Err(TaxError::InvalidInput(_))
        ));

        assert!(matches!(
            engine.analyze_as_of(&short_term_lot(1.0, 10.0), -0.01, &profile, as_of()),
            Err(TaxError::InvalidInput(_))
        ));

        let mut sell = short_term_lot(1.0, 10.0);
        sell.transaction_type = TransactionType::Sell;
        assert!(engine.analyze_as_of(&sell, 10.0, &profile, as_of()).is_err());
    }

    #[test]
    fn test_unknown_state_is_reported_not_fatal() {
        let engine = BreakEvenEngine::new();
        let profile = InvestorProfile::new(80_000.0, FilingStatus::Single, "QQ", 0.0);
        let analysis = engine
            .analyze_as_of(&short_term_lot(10.0, 10.0), 20.0, &profile, as_of())
            .unwrap();

        assert_eq!(analysis.tax_analysis.state_rate, 0.0);
        assert_eq!(analysis.warnings.len(), 1);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let engine = BreakEvenEngine::new();
        let lot = long_term_lot(12.5, 80.0);
        let first = engine.analyze_as_of(&lot, 91.0, &ny_profile(), as_of()).unwrap();
        let second = engine.analyze_as_of(&lot, 91.0, &ny_profile(), as_of()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_bracket_walk_matches_marginal_inside_one_bracket() {
        let marginal = BreakEvenEngine::new();
        let walk = BreakEvenEngine::with_solver(BracketWalkSolver);
        let lot = short_term_lot(100.0, 50.0);

        let a = marginal.analyze_as_of(&lot, 70.0, &ny_profile(), as_of()).unwrap();
        let b = walk.analyze_as_of(&lot, 70.0, &ny_profile(), as_of()).unwrap();

        let pa = a.loss_required_percentage().unwrap();
        let pb = b.loss_required_percentage().unwrap();
        assert!((pa - pb).abs() < 1e-9);
        assert_eq!(b.break_even_analysis.unwrap().solver, "bracket_walk");
    }

    #[test]
    fn test_bracket_walk_taxes_gain_crossing_brackets_more() {
        let profile = InvestorProfile::new(40_000.0, FilingStatus::Single, "TX", 0.0);
        let lot = short_term_lot(1_000.0, 10.0);

        let marginal = BreakEvenEngine::new()
            .analyze_as_of(&lot, 200.0, &profile, as_of())
            .unwrap();
        let walk = BreakEvenEngine::with_solver(BracketWalkSolver)
            .analyze_as_of(&lot, 200.0, &profile, as_of())
            .unwrap();

        assert!(
            walk.loss_required_percentage().unwrap() > marginal.loss_required_percentage().unwrap()
        );
    }

    #[test]
    fn test_bracket_walk_reports_its_own_tax() {
        let profile = InvestorProfile::new(40_000.0, FilingStatus::Single, "NY", 0.01);
        let lot = short_term_lot(1_000.0, 10.0);
        let analysis = BreakEvenEngine::with_solver(BracketWalkSolver)
            .analyze_as_of(&lot, 200.0, &profile, as_of())
            .unwrap();

        let tax = &analysis.tax_analysis;
        let value = analysis.financial_analysis.current_value;
        let p = analysis.loss_required_percentage().unwrap();
        assert!((p * value / 100.0 - tax.total_tax_owed).abs() < 1e-6);
        assert!((tax.federal_tax + tax.state_tax + tax.local_tax - tax.total_tax_owed).abs() < 1e-6);
        assert!((tax.after_tax_proceeds - (value - tax.total_tax_owed)).abs() < 1e-6);
        // Walking from 40k income taxes more than the 12% marginal rate
        assert!(tax.federal_tax > analysis.financial_analysis.current_gain_loss * tax.federal_rate);
    }
}
