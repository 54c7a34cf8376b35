//! Investor Tax Profile
//!
//! The household inputs every analysis is evaluated against.

use crate::error::{TaxError, TaxResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Federal filing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
    MarriedFilingJointly,
    MarriedFilingSeparately,
    HeadOfHousehold,
}

impl Default for FilingStatus {
    fn default() -> Self {
        Self::Single
    }
}

impl FilingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilingStatus::Single => "single",
            FilingStatus::MarriedFilingJointly => "married_filing_jointly",
            FilingStatus::MarriedFilingSeparately => "married_filing_separately",
            FilingStatus::HeadOfHousehold => "head_of_household",
        }
    }
}

impl std::fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FilingStatus {
    type Err = TaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(FilingStatus::Single),
            "married_filing_jointly" | "mfj" => Ok(FilingStatus::MarriedFilingJointly),
            "married_filing_separately" | "mfs" => Ok(FilingStatus::MarriedFilingSeparately),
            "head_of_household" | "hoh" => Ok(FilingStatus::HeadOfHousehold),
            other => Err(TaxError::InvalidInput(format!(
                "unknown filing status '{}'",
                other
            ))),
        }
    }
}

/// The single authoritative tax profile of the investor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorProfile {
    /// Annual household income, used to pick the marginal bracket
    pub annual_household_income: f64,
    pub filing_status: FilingStatus,
    /// Two-letter state code
    pub state_of_residence: String,
    /// Flat local rate as a fraction (0.01 = 1%)
    pub local_tax_rate: f64,
}

impl InvestorProfile {
    pub fn new(
        annual_household_income: f64,
        filing_status: FilingStatus,
        state_of_residence: impl Into<String>,
        local_tax_rate: f64,
    ) -> Self {
        Self {
            annual_household_income,
            filing_status,
            state_of_residence: state_of_residence.into().trim().to_uppercase(),
            local_tax_rate,
        }
    }

    /// Normalize the state code and reject values no bracket lookup can use.
    ///
    /// The state code is only checked for shape here; an unrecognized but
    /// well-formed code degrades to a zero state rate during analysis.
    pub fn validated(mut self) -> TaxResult<Self> {
        self.state_of_residence = self.state_of_residence.trim().to_uppercase();

        if !self.annual_household_income.is_finite() || self.annual_household_income < 0.0 {
            return Err(TaxError::InvalidInput(format!(
                "annual_household_income must be >= 0, got {}",
                self.annual_household_income
            )));
        }
        if !self.local_tax_rate.is_finite()
            || self.local_tax_rate < 0.0
            || self.local_tax_rate >= 1.0
        {
            return Err(TaxError::InvalidInput(format!(
                "local_tax_rate must be a fraction in [0, 1), got {}",
                self.local_tax_rate
            )));
        }
        if self.state_of_residence.len() != 2
            || !self.state_of_residence.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(TaxError::InvalidInput(format!(
                "state_of_residence must be a 2-letter code, got '{}'",
                self.state_of_residence
            )));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filing_status_parse() {
        assert_eq!(
            "married_filing_jointly".parse::<FilingStatus>().unwrap(),
            FilingStatus::MarriedFilingJointly
        );
        assert_eq!("HOH".parse::<FilingStatus>().unwrap(), FilingStatus::HeadOfHousehold);
        assert!("widowed".parse::<FilingStatus>().is_err());
    }

    #[test]
    fn test_filing_status_serde_matches_display() {
        let json = serde_json::to_string(&FilingStatus::MarriedFilingSeparately).unwrap();
        assert_eq!(json, "\"married_filing_separately\"");
        assert_eq!(FilingStatus::MarriedFilingSeparately.to_string(), "married_filing_separately");
    }

    #[test]
    fn test_validated_normalizes_state() {
        let profile = InvestorProfile {
            annual_household_income: 120_000.0,
            filing_status: FilingStatus::Single,
            state_of_residence: " ny ".to_string(),
            local_tax_rate: 0.01,
        }
        .validated()
        .unwrap();
        assert_eq!(profile.state_of_residence, "NY");
    }

    #[test]
    fn test_validated_rejects_bad_values() {
        let base = InvestorProfile::new(100_000.0, FilingStatus::Single, "CA", 0.0);

        let mut negative_income = base.clone();
        negative_income.annual_household_income = -1.0;
        assert!(negative_income.validated().is_err());

        let mut percent_not_fraction = base.clone();
        percent_not_fraction.local_tax_rate = 1.5;
        assert!(percent_not_fraction.validated().is_err());

        let mut long_state = base;
        long_state.state_of_residence = "CAL".to_string();
        assert!(long_state.validated().is_err());
    }
}
