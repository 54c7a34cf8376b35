//! Portfolio Aggregator
//!
//! Folds per-lot break-even analyses into portfolio and per-ticker summaries.

use crate::break_even::{BreakEvenAnalysis, BreakEvenEngine, Recommendation, RiskLevel};
use crate::error::TaxResult;
use crate::harvester::HarvestEstimate;
use crate::lot::{HoldingPeriod, Lot, TransactionType};
use crate::profile::InvestorProfile;
use crate::tax_calculator::{AnalysisWarning, TaxCalculator};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationCounts {
    pub hold: usize,
    pub monitor_closely: usize,
    pub consider_selling: usize,
}

impl RecommendationCounts {
    fn record(&mut self, recommendation: Recommendation) {
        match recommendation {
            Recommendation::Hold => self.hold += 1,
            Recommendation::MonitorClosely => self.monitor_closely += 1,
            Recommendation::ConsiderSelling => self.consider_selling += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskDistribution {
    fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
        }
    }
}

/// Portfolio-level break-even statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// False when no investor profile exists; every figure is then zero
    pub profile_available: bool,
    pub lots_analyzed: usize,
    pub gain_lots: usize,
    pub loss_lots: usize,
    pub total_cost_basis: f64,
    pub total_market_value: f64,
    pub total_unrealized_gain_loss: f64,
    /// Tax owed if every gain lot were sold today
    pub total_tax_liability: f64,
    /// Gain-lot value net of tax, plus cash on hand
    pub total_after_tax_proceeds: f64,
    pub cash_on_hand: f64,
    /// Simple mean over gain lots
    pub average_break_even_percentage: f64,
    /// Mean over gain lots weighted by current value
    pub value_weighted_break_even_percentage: f64,
    pub recommendation_counts: RecommendationCounts,
    pub risk_distribution: RiskDistribution,
    /// Tax owed on gain lots flagged consider_selling
    pub potential_tax_savings: f64,
    /// Combined loss lots, with the annual limit applied once
    pub tax_loss_harvest: HarvestEstimate,
    pub unpriced_tickers: Vec<String>,
    pub warnings: Vec<AnalysisWarning>,
}

impl PortfolioSummary {
    /// Summary for an empty portfolio
    pub fn empty() -> Self {
        Self {
            profile_available: true,
            lots_analyzed: 0,
            gain_lots: 0,
            loss_lots: 0,
            total_cost_basis: 0.0,
            total_market_value: 0.0,
            total_unrealized_gain_loss: 0.0,
            total_tax_liability: 0.0,
            total_after_tax_proceeds: 0.0,
            cash_on_hand: 0.0,
            average_break_even_percentage: 0.0,
            value_weighted_break_even_percentage: 0.0,
            recommendation_counts: RecommendationCounts::default(),
            risk_distribution: RiskDistribution::default(),
            potential_tax_savings: 0.0,
            tax_loss_harvest: HarvestEstimate::zero(),
            unpriced_tickers: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Placeholder shown when no profile has been set up yet
    pub fn unavailable() -> Self {
        Self {
            profile_available: false,
            ..Self::empty()
        }
    }
}

/// Summary plus the per-lot analyses it was folded from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioBreakEven {
    pub summary: PortfolioSummary,
    pub positions: Vec<BreakEvenAnalysis>,
}

/// Combined position in one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub lots: usize,
    pub quantity: f64,
    pub cost_basis: f64,
    pub current_value: f64,
    pub gain_loss: f64,
    pub total_tax_owed: f64,
    pub after_tax_proceeds: f64,
    /// Value-weighted break-even over the ticker's gain lots
    pub loss_required_percentage: Option<f64>,
    pub recommendation: Recommendation,
    pub estimated_harvest_savings: f64,
}

pub struct PortfolioAggregator<'a> {
    engine: &'a BreakEvenEngine,
}

impl<'a> PortfolioAggregator<'a> {
    pub fn new(engine: &'a BreakEvenEngine) -> Self {
        Self { engine }
    }

    /// Analyze every open buy lot and fold the results.
    ///
    /// Lots are assumed to be residual open positions already. Sell lots are
    /// skipped, as are lots whose ticker has no price.
    pub fn aggregate(
        &self,
        lots: &[Lot],
        prices: &HashMap<String, f64>,
        profile: Option<&InvestorProfile>,
        cash_on_hand: f64,
        as_of: NaiveDate,
    ) -> TaxResult<PortfolioBreakEven> {
        let Some(profile) = profile else {
            tracing::info!("no investor profile configured, returning unavailable summary");
            return Ok(PortfolioBreakEven {
                summary: PortfolioSummary::unavailable(),
                positions: Vec::new(),
            });
        };

        let mut positions = Vec::new();
        let mut unpriced = Vec::new();

        for lot in lots {
            if lot.transaction_type != TransactionType::Buy {
                continue;
            }

            let current_price = match prices.get(&lot.ticker) {
                Some(&price) => price,
                None => {
                    if !unpriced.contains(&lot.ticker) {
                        tracing::warn!(ticker = %lot.ticker, "no current price, skipping lot");
                        unpriced.push(lot.ticker.clone());
                    }
                    continue;
                }
            };

            positions.push(self.engine.analyze_as_of(lot, current_price, profile, as_of)?);
        }

        let mut summary = self.summarize(&positions, profile, cash_on_hand);
        unpriced.sort();
        summary.unpriced_tickers = unpriced;

        Ok(PortfolioBreakEven { summary, positions })
    }

    /// Fold already computed analyses into a summary
    pub fn summarize(
        &self,
        positions: &[BreakEvenAnalysis],
        profile: &InvestorProfile,
        cash_on_hand: f64,
    ) -> PortfolioSummary {
        let mut summary = PortfolioSummary::empty();
        summary.cash_on_hand = cash_on_hand;
        summary.total_after_tax_proceeds = cash_on_hand;

        let mut break_even_sum = 0.0;
        let mut weighted_sum = 0.0;
        let mut gain_value = 0.0;
        let mut total_loss = 0.0;

        for analysis in positions {
            let fa = &analysis.financial_analysis;
            summary.lots_analyzed += 1;
            summary.total_cost_basis += fa.cost_basis;
            summary.total_market_value += fa.current_value;
            summary.total_unrealized_gain_loss += fa.current_gain_loss;

            for warning in &analysis.warnings {
                if !summary.warnings.contains(warning) {
                    summary.warnings.push(warning.clone());
                }
            }

            match analysis.loss_required_percentage() {
                Some(p) => {
                    let tax = analysis.tax_analysis.total_tax_owed;
                    summary.gain_lots += 1;
                    summary.total_tax_liability += tax;
                    summary.total_after_tax_proceeds += fa.current_value - tax;
                    summary.recommendation_counts.record(analysis.recommendation);
                    summary.risk_distribution.record(RiskLevel::from_loss_required(p));
                    if analysis.recommendation == Recommendation::ConsiderSelling {
                        summary.potential_tax_savings += tax;
                    }
                    break_even_sum += p;
                    weighted_sum += p * fa.current_value;
                    gain_value += fa.current_value;
                }
                None => {
                    summary.loss_lots += 1;
                    total_loss += -fa.current_gain_loss;
                }
            }
        }

        if summary.gain_lots > 0 {
            summary.average_break_even_percentage = break_even_sum / summary.gain_lots as f64;
        }
        if gain_value > 0.0 {
            summary.value_weighted_break_even_percentage = weighted_sum / gain_value;
        }
        if summary.loss_lots > 0 {
            summary.tax_loss_harvest = self.harvest_estimate(total_loss, profile);
        }

        summary
    }

    /// Group analyses by ticker, in ticker order
    pub fn summarize_by_ticker(
        &self,
        positions: &[BreakEvenAnalysis],
        profile: &InvestorProfile,
    ) -> Vec<TickerSummary> {
        let mut by_ticker: BTreeMap<&str, Vec<&BreakEvenAnalysis>> = BTreeMap::new();
        for analysis in positions {
            by_ticker.entry(analysis.ticker.as_str()).or_default().push(analysis);
        }

        by_ticker
            .into_iter()
            .map(|(ticker, lots)| {
                let mut quantity = 0.0;
                let mut cost_basis = 0.0;
                let mut current_value = 0.0;
                let mut total_tax_owed = 0.0;
                let mut weighted = 0.0;
                let mut gain_value = 0.0;
                let mut has_gain = false;
                let mut total_loss = 0.0;

                for a in &lots {
                    quantity += a.quantity;
                    cost_basis += a.financial_analysis.cost_basis;
                    current_value += a.financial_analysis.current_value;
                    total_tax_owed += a.tax_analysis.total_tax_owed;
                    match a.loss_required_percentage() {
                        Some(p) => {
                            has_gain = true;
                            weighted += p * a.financial_analysis.current_value;
                            gain_value += a.financial_analysis.current_value;
                        }
                        None => total_loss += -a.financial_analysis.current_gain_loss,
                    }
                }

                let loss_required_percentage = if !has_gain {
                    None
                } else if gain_value > 0.0 {
                    Some(weighted / gain_value)
                } else {
                    Some(0.0)
                };

                let recommendation = loss_required_percentage
                    .map(Recommendation::from_loss_required)
                    .unwrap_or(Recommendation::ConsiderSelling);

                let estimated_harvest_savings = if total_loss > 0.0 {
                    self.harvest_estimate(total_loss, profile).estimated_savings
                } else {
                    0.0
                };

                TickerSummary {
                    ticker: ticker.to_string(),
                    lots: lots.len(),
                    quantity,
                    cost_basis,
                    current_value,
                    gain_loss: current_value - cost_basis,
                    total_tax_owed,
                    after_tax_proceeds: current_value - total_tax_owed,
                    loss_required_percentage,
                    recommendation,
                    estimated_harvest_savings,
                }
            })
            .collect()
    }

    fn harvest_estimate(&self, total_loss: f64, profile: &InvestorProfile) -> HarvestEstimate {
        // The ordinary offset rate does not depend on the holding period
        let (rates, _) = TaxCalculator::new(profile).rates(HoldingPeriod::ShortTerm);
        self.engine
            .loss_policy()
            .estimate(total_loss, profile.filing_status, &rates)
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

    fn bought(ticker: &str, quantity: f64, price: f64, y: i32, m: u32, d: u32) -> Lot {
        Lot::buy(ticker, quantity, price, NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn profile() -> InvestorProfile {
        InvestorProfile::new(300_000.0, FilingStatus::Single, "NY", 0.01)
    }

    fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(t, p)| (t.to_string(), *p)).collect()
    }

    #[test]
    fn test_empty_portfolio_is_all_zero() {
        let engine = BreakEvenEngine::new();
        let result = PortfolioAggregator::new(&engine)
            .aggregate(&[], &HashMap::new(), Some(&profile()), 0.0, as_of())
            .unwrap();

        assert!(result.positions.is_empty());
        assert_eq!(result.summary, PortfolioSummary::empty());
    }

    #[test]
    fn test_missing_profile_is_unavailable_not_error() {
        let engine = BreakEvenEngine::new();
        let lots = vec![bought("AAPL", 10.0, 100.0, 2024, 1, 2)];
        let result = PortfolioAggregator::new(&engine)
            .aggregate(&lots, &prices(&[("AAPL", 150.0)]), None, 500.0, as_of())
            .unwrap();

        assert!(!result.summary.profile_available);
        assert_eq!(result.summary.total_tax_liability, 0.0);
        assert_eq!(result.summary.total_after_tax_proceeds, 0.0);
        assert!(result.positions.is_empty());
    }

    #[test]
    fn test_totals_and_buckets() {
        let engine = BreakEvenEngine::new();
        let lots = vec![
            // long-term, small gain -> low break-even
            bought("AAPL", 10.0, 100.0, 2022, 1, 3),
            // short-term, large gain -> high break-even
            bought("NVDA", 10.0, 50.0, 2025, 2, 1),
            // loss
            bought("INTC", 100.0, 40.0, 2024, 8, 1),
            // sells are ignored
            Lot {
                transaction_type: TransactionType::Sell,
                ..bought("AAPL", 1.0, 120.0, 2025, 1, 1)
            },
        ];
        let px = prices(&[("AAPL", 110.0), ("NVDA", 150.0), ("INTC", 20.0)]);
        let aggregator = PortfolioAggregator::new(&engine);
        let result = aggregator
            .aggregate(&lots, &px, Some(&profile()), 1_000.0, as_of())
            .unwrap();
        let s = &result.summary;

        assert_eq!(result.positions.len(), 3);
        assert_eq!(s.gain_lots, 2);
        assert_eq!(s.loss_lots, 1);

        let gains: Vec<_> = result.positions.iter().filter(|a| a.is_gain()).collect();
        let expected_tax: f64 = gains.iter().map(|a| a.tax_analysis.total_tax_owed).sum();
        assert!((s.total_tax_liability - expected_tax).abs() < 1e-9);

        let expected_proceeds: f64 = gains
            .iter()
            .map(|a| a.financial_analysis.current_value - a.tax_analysis.total_tax_owed)
            .sum::<f64>()
            + 1_000.0;
        assert!((s.total_after_tax_proceeds - expected_proceeds).abs() < 1e-9);

        let mean = gains
            .iter()
            .map(|a| a.loss_required_percentage().unwrap())
            .sum::<f64>()
            / 2.0;
        assert!((s.average_break_even_percentage - mean).abs() < 1e-9);

        let counts = &s.recommendation_counts;
        assert_eq!(counts.hold + counts.monitor_closely + counts.consider_selling, 2);
        let risk = &s.risk_distribution;
        assert_eq!(risk.high, counts.consider_selling);
        assert_eq!(risk.medium, counts.monitor_closely);
        assert_eq!(risk.low, counts.hold);

        assert_eq!(s.tax_loss_harvest.unrealized_loss, 2_000.0);
        assert!(s.tax_loss_harvest.estimated_savings > 0.0);
    }

    #[test]
    fn test_potential_savings_counts_consider_selling_only() {
        let engine = BreakEvenEngine::new();
        let lots = vec![
            // 1% gain, long-term -> tiny break-even -> consider_selling
            bought("VTI", 10.0, 100.0, 2022, 1, 3),
            // big short-term gain -> hold
            bought("TSLA", 10.0, 10.0, 2025, 5, 1),
        ];
        let px = prices(&[("VTI", 101.0), ("TSLA", 100.0)]);
        let result = PortfolioAggregator::new(&engine)
            .aggregate(&lots, &px, Some(&profile()), 0.0, as_of())
            .unwrap();

        let vti = result.positions.iter().find(|a| a.ticker == "VTI").unwrap();
        assert_eq!(vti.recommendation, Recommendation::ConsiderSelling);
        let tsla = result.positions.iter().find(|a| a.ticker == "TSLA").unwrap();
        assert_eq!(tsla.recommendation, Recommendation::Hold);

        assert!((result.summary.potential_tax_savings - vti.tax_analysis.total_tax_owed).abs() < 1e-9);
    }

    #[test]
    fn test_unpriced_lots_are_skipped() {
        let engine = BreakEvenEngine::new();
        let lots = vec![
            bought("AAPL", 1.0, 100.0, 2024, 1, 2),
            bought("ZZZZ", 1.0, 100.0, 2024, 1, 2),
            bought("ZZZZ", 2.0, 90.0, 2024, 2, 2),
        ];
        let result = PortfolioAggregator::new(&engine)
            .aggregate(&lots, &prices(&[("AAPL", 120.0)]), Some(&profile()), 0.0, as_of())
            .unwrap();

        assert_eq!(result.positions.len(), 1);
        assert_eq!(result.summary.unpriced_tickers, vec!["ZZZZ".to_string()]);
    }

    #[test]
    fn test_harvest_limit_applies_once_across_lots() {
        let engine = BreakEvenEngine::new();
        let lots = vec![
            bought("AAA", 100.0, 50.0, 2024, 1, 2),
            bought("BBB", 100.0, 50.0, 2024, 1, 2),
        ];
        let px = prices(&[("AAA", 20.0), ("BBB", 20.0)]);
        let result = PortfolioAggregator::new(&engine)
            .aggregate(&lots, &px, Some(&profile()), 0.0, as_of())
            .unwrap();

        let harvest = result.summary.tax_loss_harvest;
        assert_eq!(harvest.unrealized_loss, 6_000.0);
        assert_eq!(harvest.deductible_loss, ANNUAL_LOSS_LIMIT);

        let per_lot: f64 = result
            .positions
            .iter()
            .filter_map(|a| a.tax_loss_harvesting.map(|h| h.estimated_savings))
            .sum();
        assert!(harvest.estimated_savings < per_lot);
    }

    #[test]
    fn test_ticker_view_agrees_with_portfolio_view() {
        let engine = BreakEvenEngine::new();
        let lots = vec![
            bought("AAPL", 10.0, 100.0, 2022, 1, 3),
            bought("AAPL", 5.0, 140.0, 2025, 1, 3),
            bought("MSFT", 3.0, 300.0, 2023, 1, 3),
        ];
        let px = prices(&[("AAPL", 150.0), ("MSFT", 420.0)]);
        let aggregator = PortfolioAggregator::new(&engine);
        let result = aggregator
            .aggregate(&lots, &px, Some(&profile()), 0.0, as_of())
            .unwrap();
        let tickers = aggregator.summarize_by_ticker(&result.positions, &profile());

        assert_eq!(tickers.len(), 2);
        assert_eq!(tickers[0].ticker, "AAPL");
        assert_eq!(tickers[0].lots, 2);
        assert_eq!(tickers[0].quantity, 15.0);

        let ticker_tax: f64 = tickers.iter().map(|t| t.total_tax_owed).sum();
        assert!((ticker_tax - result.summary.total_tax_liability).abs() < 1e-9);

        // With the marginal solver the weighted break-even is tax / value
        let aapl = &tickers[0];
        let implied = aapl.total_tax_owed / aapl.current_value * 100.0;
        assert!((aapl.loss_required_percentage.unwrap() - implied).abs() < 1e-9);
    }

    #[test]
    fn test_value_weighted_differs_from_simple_mean() {
        let engine = BreakEvenEngine::new();
        let lots = vec![
            bought("BIG", 1_000.0, 100.0, 2022, 1, 3),
            bought("TINY", 1.0, 1.0, 2025, 5, 1),
        ];
        let px = prices(&[("BIG", 101.0), ("TINY", 10.0)]);
        let s = PortfolioAggregator::new(&engine)
            .aggregate(&lots, &px, Some(&profile()), 0.0, as_of())
            .unwrap()
            .summary;

        assert!(s.value_weighted_break_even_percentage < s.average_break_even_percentage);
    }

    #[test]
    fn test_bracket_walk_liability_matches_break_even() {
        let engine = BreakEvenEngine::with_solver(crate::break_even::BracketWalkSolver);
        let low_income = InvestorProfile::new(40_000.0, FilingStatus::Single, "NY", 0.01);
        let lots = vec![bought("ACME", 1_000.0, 10.0, 2025, 3, 1)];
        let result = PortfolioAggregator::new(&engine)
            .aggregate(&lots, &prices(&[("ACME", 200.0)]), Some(&low_income), 0.0, as_of())
            .unwrap();

        let p = result.positions[0].loss_required_percentage().unwrap();
        let implied = p * result.summary.total_market_value / 100.0;
        assert!((result.summary.total_tax_liability - implied).abs() < 1e-6);
    }
}
