use crate::db::PortfolioDb;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tax_optimizer::{FilingStatus, InvestorProfile};

/// Storage for the single investor profile.
///
/// There is exactly one profile per deployment, so neither operation takes
/// an identifier.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// The stored profile, or `None` before one has been saved
    async fn get(&self) -> Result<Option<InvestorProfile>>;

    /// Validate and store the profile, replacing any previous one
    async fn put(&self, profile: &InvestorProfile) -> Result<InvestorProfile>;
}

pub struct SqliteProfileRepository {
    db: PortfolioDb,
}

impl SqliteProfileRepository {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileRepository for SqliteProfileRepository {
    async fn get(&self) -> Result<Option<InvestorProfile>> {
        let row: Option<(f64, String, String, f64)> = sqlx::query_as(
            r#"
            SELECT annual_household_income, filing_status, state_of_residence, local_tax_rate
            FROM investor_profile
            WHERE singleton = 1
            "#,
        )
        .fetch_optional(self.db.pool())
        .await?;

        let Some((income, status, state, local_rate)) = row else {
            return Ok(None);
        };

        let filing_status = status
            .parse::<FilingStatus>()
            .with_context(|| format!("stored filing status '{}' is unreadable", status))?;

        Ok(Some(InvestorProfile::new(income, filing_status, state, local_rate)))
    }

    async fn put(&self, profile: &InvestorProfile) -> Result<InvestorProfile> {
        let profile = profile.clone().validated()?;

        sqlx::query(
            r#"
            INSERT INTO investor_profile
            (singleton, annual_household_income, filing_status, state_of_residence, local_tax_rate, updated_at)
            VALUES (1, ?, ?, ?, ?, datetime('now'))
            ON CONFLICT(singleton) DO UPDATE SET
                annual_household_income = excluded.annual_household_income,
                filing_status = excluded.filing_status,
                state_of_residence = excluded.state_of_residence,
                local_tax_rate = excluded.local_tax_rate,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(profile.annual_household_income)
        .bind(profile.filing_status.as_str())
        .bind(&profile.state_of_residence)
        .bind(profile.local_tax_rate)
        .execute(self.db.pool())
        .await?;

        tracing::info!(
            filing_status = %profile.filing_status,
            state = %profile.state_of_residence,
            "investor profile saved"
        );
        Ok(profile)
    }
}
