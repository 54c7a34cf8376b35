use crate::db::PortfolioDb;
use crate::error::StoreError;
use crate::models::*;
use anyhow::Result;

const SELECT_COLUMNS: &str = "SELECT id, portfolio_id, ticker, quantity, price_per_share, \
     transaction_date, transaction_type, notes, created_at FROM transactions";

pub struct TransactionLog {
    db: PortfolioDb,
}

impl TransactionLog {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }

    /// Record a new transaction
    pub async fn create_transaction(&self, input: TransactionInput) -> Result<Transaction> {
        let input = input.validated()?;
        self.ensure_portfolio(input.portfolio_id).await?;

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions
            (portfolio_id, ticker, quantity, price_per_share, transaction_date, transaction_type, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, portfolio_id, ticker, quantity, price_per_share,
                      transaction_date, transaction_type, notes, created_at
            "#,
        )
        .bind(input.portfolio_id)
        .bind(&input.ticker)
        .bind(input.quantity)
        .bind(input.price_per_share)
        .bind(input.transaction_date)
        .bind(input.transaction_type.as_str())
        .bind(&input.notes)
        .fetch_one(self.db.pool())
        .await?;

        tracing::info!(
            id = transaction.id,
            ticker = %transaction.ticker,
            kind = %transaction.transaction_type,
            "transaction recorded"
        );
        Ok(transaction)
    }

    /// Get a transaction by id
    pub async fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(transaction)
    }

    /// Get a transaction, failing with `StoreError::NotFound` when absent
    pub async fn require_transaction(&self, id: i64) -> Result<Transaction> {
        self.get_transaction(id)
            .await?
            .ok_or_else(|| StoreError::not_found("transaction", id).into())
    }

    /// All transactions, oldest first
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "{} ORDER BY transaction_date, id",
            SELECT_COLUMNS
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(transactions)
    }

    /// Transactions of one portfolio, oldest first
    pub async fn transactions_for_portfolio(&self, portfolio_id: i64) -> Result<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "{} WHERE portfolio_id = ? ORDER BY transaction_date, id",
            SELECT_COLUMNS
        ))
        .bind(portfolio_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(transactions)
    }

    /// Transactions in one ticker across portfolios, oldest first
    pub async fn transactions_for_ticker(&self, ticker: &str) -> Result<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "{} WHERE ticker = ? ORDER BY transaction_date, id",
            SELECT_COLUMNS
        ))
        .bind(ticker)
        .fetch_all(self.db.pool())
        .await?;

        Ok(transactions)
    }

    /// Replace a transaction's fields
    pub async fn update_transaction(&self, id: i64, input: TransactionInput) -> Result<Transaction> {
        let input = input.validated()?;
        self.ensure_portfolio(input.portfolio_id).await?;

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET portfolio_id = ?, ticker = ?, quantity = ?, price_per_share = ?,
                transaction_date = ?, transaction_type = ?, notes = ?
            WHERE id = ?
            RETURNING id, portfolio_id, ticker, quantity, price_per_share,
                      transaction_date, transaction_type, notes, created_at
            "#,
        )
        .bind(input.portfolio_id)
        .bind(&input.ticker)
        .bind(input.quantity)
        .bind(input.price_per_share)
        .bind(input.transaction_date)
        .bind(input.transaction_type.as_str())
        .bind(&input.notes)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| StoreError::not_found("transaction", id))?;

        Ok(transaction)
    }

    /// Delete a transaction
    pub async fn delete_transaction(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("transaction", id).into());
        }

        Ok(())
    }

    async fn ensure_portfolio(&self, portfolio_id: i64) -> Result<()> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM portfolios WHERE id = ?")
            .bind(portfolio_id)
            .fetch_optional(self.db.pool())
            .await?;

        match exists {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found("portfolio", portfolio_id).into()),
        }
    }
}
