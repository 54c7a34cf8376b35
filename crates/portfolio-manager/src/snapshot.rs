//! JSON snapshot of the whole store.
//!
//! Export is a plain dump. Import replaces everything in one transaction and
//! tolerates missing sections, treating them as empty. Within a row, only
//! keys and the traded figures are required; timestamps default to the
//! import time. Rows go through the same checks as the live write paths.

use crate::db::PortfolioDb;
use crate::error::StoreError;
use crate::models::{Portfolio, PortfolioInput, PriceQuote, Transaction};
use crate::portfolio::validate_input;
use crate::prices::{validate, PriceUpdate};
use crate::profile::{ProfileRepository, SqliteProfileRepository};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tax_optimizer::InvestorProfile;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub profile: Option<InvestorProfile>,
    #[serde(default)]
    pub portfolios: Vec<Portfolio>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub prices: Vec<PriceQuote>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub profile_imported: bool,
    pub portfolios: usize,
    pub transactions: usize,
    pub prices: usize,
}

pub struct SnapshotService {
    db: PortfolioDb,
}

impl SnapshotService {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }

    pub async fn export(&self) -> Result<DataSnapshot> {
        let pool = self.db.pool();

        let profile = SqliteProfileRepository::new(self.db.clone()).get().await?;
        let portfolios = sqlx::query_as::<_, Portfolio>("SELECT * FROM portfolios ORDER BY id")
            .fetch_all(pool)
            .await?;
        let transactions = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions ORDER BY id")
            .fetch_all(pool)
            .await?;
        let prices = sqlx::query_as::<_, PriceQuote>("SELECT * FROM prices ORDER BY ticker")
            .fetch_all(pool)
            .await?;

        Ok(DataSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Some(Utc::now()),
            profile,
            portfolios,
            transactions,
            prices,
        })
    }

    /// Replace all stored data with the snapshot's contents
    pub async fn import(&self, snapshot: DataSnapshot) -> Result<ImportReport> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(StoreError::Invalid(format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            ))
            .into());
        }

        let profile = snapshot.profile.map(|p| p.validated()).transpose()?;

        let mut portfolios = Vec::with_capacity(snapshot.portfolios.len());
        for portfolio in snapshot.portfolios {
            let input = validate_input(PortfolioInput {
                name: portfolio.name,
                description: portfolio.description,
                cash_on_hand: portfolio.cash_on_hand,
            })?;
            portfolios.push(Portfolio {
                id: portfolio.id,
                name: input.name,
                description: input.description,
                cash_on_hand: input.cash_on_hand,
                created_at: portfolio.created_at,
            });
        }

        let mut prices = Vec::with_capacity(snapshot.prices.len());
        for quote in snapshot.prices {
            let update = validate(PriceUpdate {
                ticker: quote.ticker,
                price: quote.price,
            })?;
            prices.push(PriceQuote {
                ticker: update.ticker,
                price: update.price,
                updated_at: quote.updated_at,
            });
        }

        let portfolio_ids: HashSet<i64> = portfolios.iter().map(|p| p.id).collect();
        for tx in &snapshot.transactions {
            if !portfolio_ids.contains(&tx.portfolio_id) {
                return Err(StoreError::Invalid(format!(
                    "transaction {} references missing portfolio {}",
                    tx.id, tx.portfolio_id
                ))
                .into());
            }
            tx.lot()?.validate()?;
        }

        let mut db_tx = self.db.pool().begin().await?;

        for table in ["transactions", "portfolios", "prices", "investor_profile"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *db_tx)
                .await?;
        }

        if let Some(profile) = &profile {
            sqlx::query(
                r#"
                INSERT INTO investor_profile
                (singleton, annual_household_income, filing_status, state_of_residence, local_tax_rate)
                VALUES (1, ?, ?, ?, ?)
                "#,
            )
            .bind(profile.annual_household_income)
            .bind(profile.filing_status.as_str())
            .bind(&profile.state_of_residence)
            .bind(profile.local_tax_rate)
            .execute(&mut *db_tx)
            .await?;
        }

        // Missing timestamps fall back to the import time
        for portfolio in &portfolios {
            sqlx::query(
                r#"
                INSERT INTO portfolios (id, name, description, cash_on_hand, created_at)
                VALUES (?, ?, ?, ?, COALESCE(NULLIF(?, ''), datetime('now')))
                "#,
            )
            .bind(portfolio.id)
            .bind(&portfolio.name)
            .bind(&portfolio.description)
            .bind(portfolio.cash_on_hand)
            .bind(&portfolio.created_at)
            .execute(&mut *db_tx)
            .await?;
        }

        for tx in &snapshot.transactions {
            sqlx::query(
                r#"
                INSERT INTO transactions
                (id, portfolio_id, ticker, quantity, price_per_share, transaction_date, transaction_type, notes, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, COALESCE(NULLIF(?, ''), datetime('now')))
                "#,
            )
            .bind(tx.id)
            .bind(tx.portfolio_id)
            .bind(&tx.ticker)
            .bind(tx.quantity)
            .bind(tx.price_per_share)
            .bind(tx.transaction_date)
            .bind(&tx.transaction_type)
            .bind(&tx.notes)
            .bind(&tx.created_at)
            .execute(&mut *db_tx)
            .await?;
        }

        for quote in &prices {
            sqlx::query(
                r#"
                INSERT INTO prices (ticker, price, updated_at)
                VALUES (?, ?, COALESCE(NULLIF(?, ''), datetime('now')))
                "#,
            )
            .bind(&quote.ticker)
            .bind(quote.price)
            .bind(&quote.updated_at)
            .execute(&mut *db_tx)
            .await?;
        }

        db_tx.commit().await?;

        let report = ImportReport {
            profile_imported: profile.is_some(),
            portfolios: portfolios.len(),
            transactions: snapshot.transactions.len(),
            prices: prices.len(),
        };
        tracing::info!(
            portfolios = report.portfolios,
            transactions = report.transactions,
            prices = report.prices,
            "snapshot imported"
        );
        Ok(report)
    }
}
