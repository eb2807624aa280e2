//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TRADEPOST_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `TRADEPOST_DB_MAX_CONNECTIONS` - Pool size upper bound (default: 10)
//! - `TRADEPOST_DB_MIN_CONNECTIONS` - Idle connections kept open (default: 2)
//! - `TRADEPOST_DB_ACQUIRE_TIMEOUT_SECS` - Wait for a pooled connection (default: 10)
//! - `TRADEPOST_FEED_MAX_GOODS` - Goods accepted in one feed (default: 10000)
//! - `TRADEPOST_FEED_MAX_PARAMETERS` - Parameters accepted on one good (default: 64)

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use tradepost_core::feed::FeedLimits;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub url: SecretString,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub feed: FeedLimits,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the database URL is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`EngineConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("TRADEPOST_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("TRADEPOST_DATABASE_URL".to_string()))?;

        let max_connections = parse_or_default(&lookup, "TRADEPOST_DB_MAX_CONNECTIONS", 10)?;
        let min_connections = parse_or_default(&lookup, "TRADEPOST_DB_MIN_CONNECTIONS", 2)?;
        if min_connections > max_connections {
            return Err(ConfigError::InvalidEnvVar(
                "TRADEPOST_DB_MIN_CONNECTIONS".to_string(),
                format!("must not exceed max connections ({max_connections})"),
            ));
        }
        let acquire_timeout_secs =
            parse_or_default(&lookup, "TRADEPOST_DB_ACQUIRE_TIMEOUT_SECS", 10)?;

        let defaults = FeedLimits::default();
        let feed = FeedLimits {
            max_goods: parse_or_default(&lookup, "TRADEPOST_FEED_MAX_GOODS", defaults.max_goods)?,
            max_parameters: parse_or_default(
                &lookup,
                "TRADEPOST_FEED_MAX_PARAMETERS",
                defaults.max_parameters,
            )?,
        };

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
                acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            },
            feed,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            EngineConfig::from_lookup(lookup(&[("TRADEPOST_DATABASE_URL", "postgres://db/tp")]))
                .unwrap();
        assert_eq!(config.database.url.expose_secret(), "postgres://db/tp");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.database.acquire_timeout, Duration::from_secs(10));
        assert_eq!(config.feed, FeedLimits::default());
    }

    #[test]
    fn test_database_url_fallback() {
        let config =
            EngineConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://fallback")])).unwrap();
        assert_eq!(config.database.url.expose_secret(), "postgres://fallback");
    }

    #[test]
    fn test_missing_database_url() {
        let err = EngineConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "TRADEPOST_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = EngineConfig::from_lookup(lookup(&[
            ("TRADEPOST_DATABASE_URL", "postgres://db"),
            ("TRADEPOST_FEED_MAX_GOODS", "lots"),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "TRADEPOST_FEED_MAX_GOODS")
        );

        let err = EngineConfig::from_lookup(lookup(&[
            ("TRADEPOST_DATABASE_URL", "postgres://db"),
            ("TRADEPOST_DB_MIN_CONNECTIONS", "20"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_feed_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("TRADEPOST_DATABASE_URL", "postgres://db"),
            ("TRADEPOST_FEED_MAX_GOODS", "500"),
            ("TRADEPOST_FEED_MAX_PARAMETERS", " 8 "),
        ]))
        .unwrap();
        assert_eq!(config.feed.max_goods, 500);
        assert_eq!(config.feed.max_parameters, 8);
    }
}
