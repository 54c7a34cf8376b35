use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;

/// Which break-even solver the server's engine uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    MarginalRate,
    BracketWalk,
}

impl std::str::FromStr for SolverKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "marginal_rate" | "marginal" => Ok(SolverKind::MarginalRate),
            "bracket_walk" | "bracket" => Ok(SolverKind::BracketWalk),
            other => anyhow::bail!("unknown break-even solver '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Allowed CORS origins; empty or `*` allows any origin
    pub cors_allowed_origins: Vec<String>,
    pub solver: SolverKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "sqlite:breakeven.db".to_string(),
            cors_allowed_origins: Vec::new(),
            solver: SolverKind::MarginalRate,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            host: env::var("BREAKEVEN_HOST").unwrap_or(defaults.host),
            port: env::var("BREAKEVEN_PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .context("BREAKEVEN_PORT must be a port number")?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
            solver: env::var("BREAKEVEN_SOLVER")
                .unwrap_or_else(|_| "marginal_rate".to_string())
                .parse()?,
        };

        Ok(config)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
