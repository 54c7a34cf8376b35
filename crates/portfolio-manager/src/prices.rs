use crate::db::PortfolioDb;
use crate::error::StoreError;
use crate::models::PriceQuote;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry of a bulk price update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub ticker: String,
    pub price: f64,
}

/// Current market prices, one per ticker
pub struct PriceBook {
    db: PortfolioDb,
}

impl PriceBook {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }

    pub async fn list_prices(&self) -> Result<Vec<PriceQuote>> {
        let quotes = sqlx::query_as::<_, PriceQuote>("SELECT * FROM prices ORDER BY ticker")
            .fetch_all(self.db.pool())
            .await?;

        Ok(quotes)
    }

    pub async fn get_price(&self, ticker: &str) -> Result<Option<PriceQuote>> {
        let ticker = tax_optimizer::normalize_ticker(ticker)?;
        let quote = sqlx::query_as::<_, PriceQuote>("SELECT * FROM prices WHERE ticker = ?")
            .bind(&ticker)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(quote)
    }

    /// Insert or replace the price of a ticker
    pub async fn set_price(&self, ticker: &str, price: f64) -> Result<PriceQuote> {
        let update = validate(PriceUpdate {
            ticker: ticker.to_string(),
            price,
        })?;

        let quote = sqlx::query_as::<_, PriceQuote>(
            r#"
            INSERT INTO prices (ticker, price, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(ticker) DO UPDATE SET price = excluded.price, updated_at = excluded.updated_at
            RETURNING ticker, price, updated_at
            "#,
        )
        .bind(&update.ticker)
        .bind(update.price)
        .fetch_one(self.db.pool())
        .await?;

        tracing::debug!(ticker = %quote.ticker, price = quote.price, "price updated");
        Ok(quote)
    }

    /// Apply many updates atomically; one invalid entry rejects the batch
    pub async fn set_prices(&self, updates: Vec<PriceUpdate>) -> Result<usize> {
        let updates = updates
            .into_iter()
            .map(validate)
            .collect::<Result<Vec<_>>>()?;

        let mut tx = self.db.pool().begin().await?;
        for update in &updates {
            sqlx::query(
                r#"
                INSERT INTO prices (ticker, price, updated_at)
                VALUES (?, ?, datetime('now'))
                ON CONFLICT(ticker) DO UPDATE SET price = excluded.price, updated_at = excluded.updated_at
                "#,
            )
            .bind(&update.ticker)
            .bind(update.price)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(count = updates.len(), "bulk price update applied");
        Ok(updates.len())
    }

    /// Ticker to price lookup for the aggregator
    pub async fn price_map(&self) -> Result<HashMap<String, f64>> {
        let rows: Vec<(String, f64)> = sqlx::query_as("SELECT ticker, price FROM prices")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.into_iter().collect())
    }
}

pub(crate) fn validate(update: PriceUpdate) -> Result<PriceUpdate> {
    let ticker = tax_optimizer::normalize_ticker(&update.ticker)?;
    if !update.price.is_finite() || update.price < 0.0 {
        return Err(StoreError::Invalid(format!(
            "price for {} must be >= 0, got {}",
            ticker, update.price
        ))
        .into());
    }
    Ok(PriceUpdate {
        ticker,
        price: update.price,
    })
}
