//! Tax Lots
//!
//! An acquisition (or disposal) event as seen by the engine.

use crate::error::{TaxError, TaxResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Days a lot must be held to qualify for long-term treatment
pub const LONG_TERM_THRESHOLD_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "buy",
            TransactionType::Sell => "sell",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = TaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(TransactionType::Buy),
            "sell" => Ok(TransactionType::Sell),
            other => Err(TaxError::InvalidInput(format!(
                "transaction_type must be 'buy' or 'sell', got '{}'",
                other
            ))),
        }
    }
}

/// Holding period classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldingPeriod {
    ShortTerm,
    LongTerm,
}

/// A lot of shares bought (or sold) on a given date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Storage id, absent for ad hoc lots
    pub id: Option<i64>,
    pub ticker: String,
    pub quantity: f64,
    /// Cost basis per share
    pub price_per_share: f64,
    pub transaction_date: NaiveDate,
    pub transaction_type: TransactionType,
}

impl Lot {
    pub fn buy(
        ticker: impl Into<String>,
        quantity: f64,
        price_per_share: f64,
        transaction_date: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            ticker: ticker.into().trim().to_uppercase(),
            quantity,
            price_per_share,
            transaction_date,
            transaction_type: TransactionType::Buy,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Total cost basis
    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.price_per_share
    }

    /// Days held as of a date; lots dated in the future count as zero
    pub fn days_held(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.transaction_date).num_days().max(0)
    }

    pub fn holding_period(&self, as_of: NaiveDate) -> HoldingPeriod {
        if self.days_held(as_of) >= LONG_TERM_THRESHOLD_DAYS {
            HoldingPeriod::LongTerm
        } else {
            HoldingPeriod::ShortTerm
        }
    }

    pub fn days_until_long_term(&self, as_of: NaiveDate) -> Option<i64> {
        let days_held = self.days_held(as_of);
        if days_held >= LONG_TERM_THRESHOLD_DAYS {
            None
        } else {
            Some(LONG_TERM_THRESHOLD_DAYS - days_held)
        }
    }

    /// Check the lot's shape; quantity and basis must be positive.
    pub fn validate(&self) -> TaxResult<()> {
        validate_ticker(&self.ticker)?;
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(TaxError::InvalidInput(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if !self.price_per_share.is_finite() || self.price_per_share <= 0.0 {
            return Err(TaxError::InvalidInput(format!(
                "price_per_share must be positive, got {}",
                self.price_per_share
            )));
        }
        Ok(())
    }
}

/// Normalize a ticker to uppercase, rejecting anything but 1-5 letters.
pub fn normalize_ticker(raw: &str) -> TaxResult<String> {
    let ticker = raw.trim().to_uppercase();
    validate_ticker(&ticker)?;
    Ok(ticker)
}

fn validate_ticker(ticker: &str) -> TaxResult<()> {
    let valid = (1..=5).contains(&ticker.len()) && ticker.chars().all(|c| c.is_ascii_uppercase());
    if valid {
        Ok(())
    } else {
        Err(TaxError::InvalidInput(format!(
            "ticker must be 1-5 uppercase letters, got '{}'",
            ticker
        )))
    }
}
