//! Tax Calculator
//!
//! Resolves the marginal rates that apply to a sale and the tax owed on it.

use crate::lot::HoldingPeriod;
use crate::profile::InvestorProfile;
use crate::tax_tables::{long_term_brackets, marginal_rate, ordinary_brackets, state_capital_gains_rate};
use serde::{Deserialize, Serialize};

/// Non-fatal notices attached to an analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// State code not in the rate table; a zero state rate was used
    UnknownStateCode { state: String },
}

impl std::fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisWarning::UnknownStateCode { state } => write!(
                f,
                "State '{}' is not in the rate table; state tax was treated as zero",
                state
            ),
        }
    }
}

/// Marginal rates applying to one sale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxRates {
    /// Federal rate for the lot's holding period
    pub federal: f64,
    /// Federal ordinary-income rate, used for loss offsets
    pub ordinary: f64,
    pub state: f64,
    pub local: f64,
}

impl TaxRates {
    /// Federal + state + local
    pub fn combined(&self) -> f64 {
        self.federal + self.state + self.local
    }

    /// Rate at which a deducted loss offsets ordinary income
    pub fn ordinary_offset(&self) -> f64 {
        self.ordinary + self.state + self.local
    }
}

/// Tax owed on a sale, component by component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub federal_tax: f64,
    pub state_tax: f64,
    pub local_tax: f64,
    pub total_tax_owed: f64,
}

impl TaxBreakdown {
    pub fn zero() -> Self {
        Self {
            federal_tax: 0.0,
            state_tax: 0.0,
            local_tax: 0.0,
            total_tax_owed: 0.0,
        }
    }
}

/// Rate resolver for one investor profile
#[derive(Debug, Clone)]
pub struct TaxCalculator<'a> {
    profile: &'a InvestorProfile,
}

impl<'a> TaxCalculator<'a> {
    pub fn new(profile: &'a InvestorProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &InvestorProfile {
        self.profile
    }

    /// Resolve rates for a holding period.
    ///
    /// An unknown state code resolves to a zero state rate and yields a warning.
    pub fn rates(&self, holding_period: HoldingPeriod) -> (TaxRates, Option<AnalysisWarning>) {
        let income = self.profile.annual_household_income;
        let status = self.profile.filing_status;

        let ordinary = marginal_rate(ordinary_brackets(status), income);
        let federal = match holding_period {
            HoldingPeriod::ShortTerm => ordinary,
            HoldingPeriod::LongTerm => marginal_rate(long_term_brackets(status), income),
        };

        let (state, warning) = match state_capital_gains_rate(&self.profile.state_of_residence) {
            Some(rate) => (rate, None),
            None => {
                tracing::warn!(
                    state = %self.profile.state_of_residence,
                    "unknown state code, falling back to zero state tax"
                );
                (
                    0.0,
                    Some(AnalysisWarning::UnknownStateCode {
                        state: self.profile.state_of_residence.clone(),
                    }),
                )
            }
        };

        let rates = TaxRates {
            federal,
            ordinary,
            state,
            local: self.profile.local_tax_rate,
        };

        (rates, warning)
    }

    /// Tax owed on a realized gain; losses owe nothing
    pub fn tax_on_gain(&self, gain: f64, rates: &TaxRates) -> TaxBreakdown {
        if gain <= 0.0 {
            return TaxBreakdown::zero();
        }

        let federal_tax = gain * rates.federal;
        let state_tax = gain * rates.state;
        let local_tax = gain * rates.local;

        TaxBreakdown {
            federal_tax,
            state_tax,
            local_tax,
            total_tax_owed: federal_tax + state_tax + local_tax,
        }
    }
}
