use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `config.toml`; missing sections fall back to
/// their `Default` implementation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub quotes: QuoteConfig,
    pub accounts: AccountsConfig,
    pub portfolio: PortfolioConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the PostgreSQL ledger store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string. When absent, `DATABASE_URL` from the environment is used.
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Which quote provider backs price lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    /// Live prices from the IEX Cloud HTTP API.
    Iex,
    /// The static price table under `[quotes.fixed_prices]`.
    Fixed,
}

/// Settings for the quote provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    pub source: QuoteSource,
    pub base_url: String,
    pub api_token: Option<String>,
    /// Upper bound on a single lookup, including connection setup.
    pub timeout_ms: u64,
    /// Prices served by the `fixed` source, keyed by symbol.
    pub fixed_prices: HashMap<String, Decimal>,
}

/// Defaults applied when opening new accounts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    pub initial_cash: Decimal,
}

/// What the portfolio view does when a held symbol cannot be priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum QuoteFailurePolicy {
    /// Fail the whole request.
    #[default]
    Fail,
    /// Report the position as unpriced and leave it out of the total.
    Omit,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    pub quote_failure: QuoteFailurePolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

// --- Default Implementations ---

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            source: QuoteSource::Iex,
            base_url: "https://cloud.iexapis.com/stable".to_string(),
            api_token: None,
            timeout_ms: 3_000,
            fixed_prices: HashMap::new(),
        }
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            initial_cash: dec!(10000.00),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl Config {
    /// Checks the cross-field rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accounts.initial_cash.is_sign_negative() {
            return Err(ConfigError::ValidationError(format!(
                "accounts.initial_cash must not be negative, got {}",
                self.accounts.initial_cash
            )));
        }
        if self.quotes.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "quotes.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.quotes.source == QuoteSource::Iex
            && self.quotes.api_token.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::ValidationError(
                "quotes.api_token is required when quotes.source = \"iex\"".to_string(),
            ));
        }
        if let Some((symbol, price)) = self
            .quotes
            .fixed_prices
            .iter()
            .find(|(_, price)| **price <= Decimal::ZERO)
        {
            return Err(ConfigError::ValidationError(format!(
                "quotes.fixed_prices.{} must be positive, got {}",
                symbol, price
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
