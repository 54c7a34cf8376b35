use crate::db::PortfolioDb;
use crate::error::StoreError;
use crate::models::*;
use anyhow::Result;

pub struct PortfolioManager {
    db: PortfolioDb,
}

impl PortfolioManager {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }

    /// Get a reference to the database
    pub fn db(&self) -> &PortfolioDb {
        &self.db
    }

    /// Create a portfolio
    pub async fn create_portfolio(&self, input: PortfolioInput) -> Result<Portfolio> {
        let input = validate_input(input)?;

        let portfolio = sqlx::query_as::<_, Portfolio>(
            r#"
            INSERT INTO portfolios (name, description, cash_on_hand)
            VALUES (?, ?, ?)
            RETURNING id, name, description, cash_on_hand, created_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.cash_on_hand)
        .fetch_one(self.db.pool())
        .await?;

        tracing::info!(id = portfolio.id, name = %portfolio.name, "portfolio created");
        Ok(portfolio)
    }

    /// Get all portfolios
    pub async fn list_portfolios(&self) -> Result<Vec<Portfolio>> {
        let portfolios = sqlx::query_as::<_, Portfolio>("SELECT * FROM portfolios ORDER BY id")
            .fetch_all(self.db.pool())
            .await?;

        Ok(portfolios)
    }

    /// Get a portfolio by id
    pub async fn get_portfolio(&self, id: i64) -> Result<Option<Portfolio>> {
        let portfolio = sqlx::query_as::<_, Portfolio>("SELECT * FROM portfolios WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(portfolio)
    }

    /// Get a portfolio, failing with `StoreError::NotFound` when absent
    pub async fn require_portfolio(&self, id: i64) -> Result<Portfolio> {
        self.get_portfolio(id)
            .await?
            .ok_or_else(|| StoreError::not_found("portfolio", id).into())
    }

    /// Update a portfolio
    pub async fn update_portfolio(&self, id: i64, input: PortfolioInput) -> Result<Portfolio> {
        let input = validate_input(input)?;

        let portfolio = sqlx::query_as::<_, Portfolio>(
            r#"
            UPDATE portfolios
            SET name = ?, description = ?, cash_on_hand = ?
            WHERE id = ?
            RETURNING id, name, description, cash_on_hand, created_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.cash_on_hand)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| StoreError::not_found("portfolio", id))?;

        Ok(portfolio)
    }

    /// Delete a portfolio together with its transactions
    pub async fn delete_portfolio(&self, id: i64) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("DELETE FROM transactions WHERE portfolio_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM portfolios WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("portfolio", id).into());
        }

        tx.commit().await?;
        tracing::info!(id, "portfolio deleted");
        Ok(())
    }
}

pub(crate) fn validate_input(mut input: PortfolioInput) -> Result<PortfolioInput, StoreError> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(StoreError::Invalid("portfolio name must not be empty".to_string()));
    }
    if !input.cash_on_hand.is_finite() || input.cash_on_hand < 0.0 {
        return Err(StoreError::Invalid(format!(
            "cash_on_hand must be >= 0, got {}",
            input.cash_on_hand
        )));
    }
    Ok(input)
}
