//! Subcommand implementations.

pub mod account;
pub mod ingest;
pub mod migrate;
pub mod order;

use std::io::Write;

use serde::Serialize;
use thiserror::Error;
use tradepost_engine::config::ConfigError;
use tradepost_engine::db::{self, PgStore};
use tradepost_engine::{EngineConfig, ServiceError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid feed file: {0}")]
    Feed(#[from] serde_yaml::Error),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("No account with email: {0}")]
    UnknownAccount(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Load configuration and connect to the database.
async fn connect() -> Result<(EngineConfig, PgStore), CommandError> {
    let config = EngineConfig::from_env()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database).await?;
    Ok((config, PgStore::new(pool)))
}

/// Write `value` to stdout as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}
