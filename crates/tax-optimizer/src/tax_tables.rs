//! Tax Tables
//!
//! 2024 federal brackets by filing status and top marginal state rates.

use crate::profile::FilingStatus;

/// One marginal bracket: income up to and including `upper` is taxed at `rate`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub upper: f64,
    pub rate: f64,
}

const fn bracket(upper: f64, rate: f64) -> Bracket {
    Bracket { upper, rate }
}

const ORDINARY_SINGLE: [Bracket; 7] = [
    bracket(11_600.0, 0.10),
    bracket(47_150.0, 0.12),
    bracket(100_525.0, 0.22),
    bracket(191_950.0, 0.24),
    bracket(243_725.0, 0.32),
    bracket(609_350.0, 0.35),
    bracket(f64::INFINITY, 0.37),
];

const ORDINARY_JOINT: [Bracket; 7] = [
    bracket(23_200.0, 0.10),
    bracket(94_300.0, 0.12),
    bracket(201_050.0, 0.22),
    bracket(383_900.0, 0.24),
    bracket(487_450.0, 0.32),
    bracket(731_200.0, 0.35),
    bracket(f64::INFINITY, 0.37),
];

const ORDINARY_SEPARATE: [Bracket; 7] = [
    bracket(11_600.0, 0.10),
    bracket(47_150.0, 0.12),
    bracket(100_525.0, 0.22),
    bracket(191_950.0, 0.24),
    bracket(243_725.0, 0.32),
    bracket(365_600.0, 0.35),
    bracket(f64::INFINITY, 0.37),
];

const ORDINARY_HEAD: [Bracket; 7] = [
    bracket(16_550.0, 0.10),
    bracket(63_100.0, 0.12),
    bracket(100_500.0, 0.22),
    bracket(191_950.0, 0.24),
    bracket(243_700.0, 0.32),
    bracket(609_350.0, 0.35),
    bracket(f64::INFINITY, 0.37),
];

const LONG_TERM_SINGLE: [Bracket; 3] = [
    bracket(47_025.0, 0.0),
    bracket(518_900.0, 0.15),
    bracket(f64::INFINITY, 0.20),
];

const LONG_TERM_JOINT: [Bracket; 3] = [
    bracket(94_050.0, 0.0),
    bracket(583_750.0, 0.15),
    bracket(f64::INFINITY, 0.20),
];

const LONG_TERM_SEPARATE: [Bracket; 3] = [
    bracket(47_025.0, 0.0),
    bracket(291_850.0, 0.15),
    bracket(f64::INFINITY, 0.20),
];

const LONG_TERM_HEAD: [Bracket; 3] = [
    bracket(63_000.0, 0.0),
    bracket(551_350.0, 0.15),
    bracket(f64::INFINITY, 0.20),
];

/// Ordinary-income brackets, applied to short-term gains
pub fn ordinary_brackets(status: FilingStatus) -> &'static [Bracket] {
    match status {
        FilingStatus::Single => &ORDINARY_SINGLE,
        FilingStatus::MarriedFilingJointly => &ORDINARY_JOINT,
        FilingStatus::MarriedFilingSeparately => &ORDINARY_SEPARATE,
        FilingStatus::HeadOfHousehold => &ORDINARY_HEAD,
    }
}

/// Long-term capital-gains brackets
pub fn long_term_brackets(status: FilingStatus) -> &'static [Bracket] {
    match status {
        FilingStatus::Single => &LONG_TERM_SINGLE,
        FilingStatus::MarriedFilingJointly => &LONG_TERM_JOINT,
        FilingStatus::MarriedFilingSeparately => &LONG_TERM_SEPARATE,
        FilingStatus::HeadOfHousehold => &LONG_TERM_HEAD,
    }
}

/// Marginal rate of the bracket `income` falls into
pub fn marginal_rate(brackets: &[Bracket], income: f64) -> f64 {
    brackets
        .iter()
        .find(|b| income <= b.upper)
        .or_else(|| brackets.last())
        .map(|b| b.rate)
        .unwrap_or(0.0)
}

/// Tax on `amount` stacked on top of `base_income`, walking every bracket it spans
pub fn stacked_tax(brackets: &[Bracket], base_income: f64, amount: f64) -> f64 {
    if amount <= 0.0 {
        return 0.0;
    }

    let top = base_income + amount;
    let mut lower: f64 = 0.0;
    let mut tax = 0.0;

    for b in brackets {
        let from = lower.max(base_income);
        let to = b.upper.min(top);
        if to > from {
            tax += (to - from) * b.rate;
        }
        if b.upper >= top {
            break;
        }
        lower = b.upper;
    }

    tax
}

/// Top marginal rate applied to capital gains by a state (or DC).
///
/// Returns `None` for codes outside the table. States without a broad
/// income tax map to zero. Washington's excise on large long-term gains and
/// New Hampshire's interest/dividend tax are not modeled.
pub fn state_capital_gains_rate(code: &str) -> Option<f64> {
    let rate = match code {
        "AL" => 0.05,
        "AK" => 0.0,
        "AZ" => 0.025,
        "AR" => 0.039,
        "CA" => 0.133,
        "CO" => 0.044,
        "CT" => 0.0699,
        "DE" => 0.066,
        "DC" => 0.1075,
        "FL" => 0.0,
        "GA" => 0.0539,
        "HI" => 0.0725,
        "ID" => 0.058,
        "IL" => 0.0495,
        "IN" => 0.0305,
        "IA" => 0.057,
        "KS" => 0.057,
        "KY" => 0.04,
        "LA" => 0.0425,
        "ME" => 0.0715,
        "MD" => 0.0575,
        "MA" => 0.05,
        "MI" => 0.0425,
        "MN" => 0.0985,
        "MS" => 0.047,
        "MO" => 0.048,
        "MT" => 0.059,
        "NE" => 0.0584,
        "NV" => 0.0,
        "NH" => 0.0,
        "NJ" => 0.1075,
        "NM" => 0.059,
        "NY" => 0.109,
        "NC" => 0.045,
        "ND" => 0.025,
        "OH" => 0.035,
        "OK" => 0.0475,
        "OR" => 0.099,
        "PA" => 0.0307,
        "RI" => 0.0599,
        "SC" => 0.064,
        "SD" => 0.0,
        "TN" => 0.0,
        "TX" => 0.0,
        "UT" => 0.0465,
        "VT" => 0.0875,
        "VA" => 0.0575,
        "WA" => 0.0,
        "WV" => 0.0512,
        "WI" => 0.0765,
        "WY" => 0.0,
        _ => return None,
    };
    Some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marginal_rate_lookup() {
        let single = ordinary_brackets(FilingStatus::Single);
        assert_eq!(marginal_rate(single, 0.0), 0.10);
        assert_eq!(marginal_rate(single, 11_600.0), 0.10);
        assert_eq!(marginal_rate(single, 11_600.01), 0.12);
        assert_eq!(marginal_rate(single, 300_000.0), 0.35);
        assert_eq!(marginal_rate(single, 10_000_000.0), 0.37);

        let lt = long_term_brackets(FilingStatus::MarriedFilingJointly);
        assert_eq!(marginal_rate(lt, 80_000.0), 0.0);
        assert_eq!(marginal_rate(lt, 300_000.0), 0.15);
        assert_eq!(marginal_rate(lt, 600_000.0), 0.20);
    }

    #[test]
    fn test_stacked_tax_within_one_bracket() {
        let single = ordinary_brackets(FilingStatus::Single);
        let tax = stacked_tax(single, 300_000.0, 2_000.0);
        assert!((tax - 700.0).abs() < 1e-9);
    }

    #[test]
    fn test_stacked_tax_crosses_brackets() {
        let lt = long_term_brackets(FilingStatus::Single);
        // 5,000 at 0% then 5,000 at 15%
        let tax = stacked_tax(lt, 42_025.0, 10_000.0);
        assert!((tax - 750.0).abs() < 1e-9);
    }

    #[test]
    fn test_stacked_tax_from_zero_income() {
        let single = ordinary_brackets(FilingStatus::Single);
        assert!((stacked_tax(single, 0.0, 11_600.0) - 1_160.0).abs() < 1e-9);
        // 11,600 at 10% then 8,400 at 12%
        assert!((stacked_tax(single, 0.0, 20_000.0) - 2_168.0).abs() < 1e-9);
    }

    #[test]
    fn test_stacked_tax_non_positive_amount() {
        let single = ordinary_brackets(FilingStatus::Single);
        assert_eq!(stacked_tax(single, 50_000.0, 0.0), 0.0);
        assert_eq!(stacked_tax(single, 50_000.0, -500.0), 0.0);
    }

    #[test]
    fn test_state_table() {
        assert_eq!(state_capital_gains_rate("FL"), Some(0.0));
        assert!(state_capital_gains_rate("NY").unwrap() > 0.0);
        assert_eq!(state_capital_gains_rate("ZZ"), None);
    }
}
