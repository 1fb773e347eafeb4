//! Configuration
//!
//! Settings come from CLI flags with environment fallbacks; a `.env` file is
//! loaded first when present.

use clap::Args;
use rusty_money::iso::{self, Currency};
use storefront::carts::DEFAULT_MAX_ITEMS;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configured currency is not an ISO 4217 code.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// The cart line ceiling must allow at least one line.
    #[error("cart_max_items must be at least 1")]
    InvalidCartMaxItems,
}

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(
        long,
        env = "LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact,
        global = true
    )]
    pub log_format: LogFormat,
}

/// Store settings.
#[derive(Debug, Args)]
pub struct StoreConfig {
    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// ISO 4217 code every price is expressed in
    #[arg(long, env = "STORE_CURRENCY", default_value = "RUB")]
    pub currency: String,

    /// Most distinct lines a cart may hold
    #[arg(long, env = "CART_MAX_ITEMS", default_value_t = DEFAULT_MAX_ITEMS)]
    pub cart_max_items: usize,
}

impl StoreConfig {
    /// The configured store currency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCurrency`] if the code is not recognised.
    pub fn currency(&self) -> Result<&'static Currency, ConfigError> {
        iso::find(&self.currency.to_ascii_uppercase())
            .ok_or_else(|| ConfigError::UnknownCurrency(self.currency.clone()))
    }

    /// The configured cart line ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCartMaxItems`] when it is zero.
    pub fn cart_max_items(&self) -> Result<usize, ConfigError> {
        match self.cart_max_items {
            0 => Err(ConfigError::InvalidCartMaxItems),
            max => Ok(max),
        }
    }
}

/// Load `.env` into the process environment, ignoring a missing file.
pub fn load_dotenv() {
    _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{EUR, RUB};

    use super::*;

    fn store_config(currency: &str, cart_max_items: usize) -> StoreConfig {
        StoreConfig {
            database_url: "postgres://localhost/storefront".to_string(),
            currency: currency.to_string(),
            cart_max_items,
        }
    }

    #[test]
    fn currency_codes_are_case_insensitive() {
        assert_eq!(store_config("rub", 30).currency().ok(), Some(RUB));
        assert_eq!(store_config("EUR", 30).currency().ok(), Some(EUR));
    }

    #[test]
    fn unknown_currency_is_rejected() {
        assert!(matches!(
            store_config("XXZ", 30).currency(),
            Err(ConfigError::UnknownCurrency(code)) if code == "XXZ"
        ));
    }

    #[test]
    fn zero_cart_ceiling_is_rejected() {
        assert!(matches!(
            store_config("RUB", 0).cart_max_items(),
            Err(ConfigError::InvalidCartMaxItems)
        ));
        assert_eq!(store_config("RUB", 5).cart_max_items().ok(), Some(5));
    }
}
