//! Tax-Loss Harvesting Estimate
//!
//! Savings from realizing a loss against ordinary income. Wash-sale rules
//! and multi-year carryovers are not modeled.

use crate::profile::FilingStatus;
use crate::tax_calculator::TaxRates;
use serde::{Deserialize, Serialize};

/// Annual net capital loss deductible against ordinary income
pub const ANNUAL_LOSS_LIMIT: f64 = 3_000.0;

/// Annual limit for married couples filing separately
pub const MARRIED_SEPARATE_LOSS_LIMIT: f64 = 1_500.0;

/// How realized losses offset ordinary income
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossOffsetPolicy {
    /// Whether losses may offset ordinary income at all
    pub ordinary_income_offset: bool,
    pub annual_limit: f64,
    pub married_separate_limit: f64,
}

impl Default for LossOffsetPolicy {
    fn default() -> Self {
        Self {
            ordinary_income_offset: true,
            annual_limit: ANNUAL_LOSS_LIMIT,
            married_separate_limit: MARRIED_SEPARATE_LOSS_LIMIT,
        }
    }
}

impl LossOffsetPolicy {
    pub fn limit_for(&self, status: FilingStatus) -> f64 {
        match status {
            FilingStatus::MarriedFilingSeparately => self.married_separate_limit,
            _ => self.annual_limit,
        }
    }

    /// Estimate savings from realizing `unrealized_loss` (a positive amount)
    pub fn estimate(
        &self,
        unrealized_loss: f64,
        status: FilingStatus,
        rates: &TaxRates,
    ) -> HarvestEstimate {
        let unrealized_loss = unrealized_loss.abs();
        let offset_rate = rates.ordinary_offset();

        if !self.ordinary_income_offset {
            return HarvestEstimate {
                unrealized_loss,
                deductible_loss: 0.0,
                offset_rate,
                estimated_savings: 0.0,
            };
        }

        let deductible_loss = unrealized_loss.min(self.limit_for(status));

        HarvestEstimate {
            unrealized_loss,
            deductible_loss,
            offset_rate,
            estimated_savings: deductible_loss * offset_rate,
        }
    }
}

/// Savings from harvesting one loss (or a portfolio's combined losses)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarvestEstimate {
    /// Loss amount, as a positive number
    pub unrealized_loss: f64,
    /// Part of the loss deductible this year
    pub deductible_loss: f64,
    pub offset_rate: f64,
    pub estimated_savings: f64,
}

impl HarvestEstimate {
    pub fn zero() -> Self {
        Self {
            unrealized_loss: 0.0,
            deductible_loss: 0.0,
            offset_rate: 0.0,
            estimated_savings: 0.0,
        }
    }
}
