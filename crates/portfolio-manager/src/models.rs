use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tax_optimizer::{Lot, TaxResult, TransactionType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Portfolio {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cash_on_hand: f64,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub cash_on_hand: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    pub portfolio_id: i64,
    pub ticker: String,
    pub quantity: f64,
    pub price_per_share: f64,
    pub transaction_date: NaiveDate,
    pub transaction_type: String, // "buy" or "sell"
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Transaction {
    pub fn kind(&self) -> TaxResult<TransactionType> {
        self.transaction_type.parse()
    }

    /// The transaction as an engine lot
    pub fn lot(&self) -> TaxResult<Lot> {
        Ok(Lot {
            id: Some(self.id),
            ticker: self.ticker.clone(),
            quantity: self.quantity,
            price_per_share: self.price_per_share,
            transaction_date: self.transaction_date,
            transaction_type: self.kind()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInput {
    pub portfolio_id: i64,
    pub ticker: String,
    pub quantity: f64,
    pub price_per_share: f64,
    pub transaction_date: NaiveDate,
    pub transaction_type: TransactionType,
    pub notes: Option<String>,
}

impl TransactionInput {
    /// Normalize the ticker and check the numeric fields
    pub fn validated(mut self) -> TaxResult<Self> {
        let lot = Lot {
            id: None,
            ticker: tax_optimizer::normalize_ticker(&self.ticker)?,
            quantity: self.quantity,
            price_per_share: self.price_per_share,
            transaction_date: self.transaction_date,
            transaction_type: self.transaction_type,
        };
        lot.validate()?;
        self.ticker = lot.ticker;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriceQuote {
    pub ticker: String,
    pub price: f64,
    #[serde(default)]
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(ticker: &str, quantity: f64) -> TransactionInput {
        TransactionInput {
            portfolio_id: 1,
            ticker: ticker.to_string(),
            quantity,
            price_per_share: 10.0,
            transaction_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            transaction_type: TransactionType::Buy,
            notes: None,
        }
    }

    #[test]
    fn test_input_normalizes_ticker() {
        let validated = input("aapl", 3.0).validated().unwrap();
        assert_eq!(validated.ticker, "AAPL");
    }

    #[test]
    fn test_input_rejects_bad_quantity_and_ticker() {
        assert!(input("AAPL", 0.0).validated().is_err());
        assert!(input("AAPL1", 1.0).validated().is_err());
    }

    #[test]
    fn test_transaction_to_lot() {
        let tx = Transaction {
            id: 9,
            portfolio_id: 1,
            ticker: "MSFT".to_string(),
            quantity: 2.0,
            price_per_share: 300.0,
            transaction_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            transaction_type: "sell".to_string(),
            notes: None,
            created_at: String::new(),
        };
        let lot = tx.lot().unwrap();
        assert_eq!(lot.id, Some(9));
        assert_eq!(lot.transaction_type, TransactionType::Sell);
    }
}
