//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! tradepost migrate
//! ```
//!
//! Migration files live in `crates/engine/migrations/` and are embedded at
//! build time.

use tradepost_engine::db;

use super::{CommandError, connect};

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let (_, store) = connect().await?;

    tracing::info!("Running migrations...");
    db::migrate(store.pool()).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
