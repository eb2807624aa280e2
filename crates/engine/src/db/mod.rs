//! `PostgreSQL` store.
//!
//! # Tables
//!
//! - `accounts`, `confirmation_tokens` - identities and pending confirmations
//! - `shops`, `categories`, `shop_categories` - catalog structure
//! - `products`, `listings`, `parameters`, `listing_parameters` - offers
//! - `contacts` - delivery addresses
//! - `orders`, `order_items` - baskets and placed orders
//!
//! # Migrations
//!
//! Migrations live in `crates/engine/migrations/` and are embedded in the
//! binary. Run them with:
//! ```bash
//! cargo run -p tradepost-cli -- migrate
//! ```
//!
//! All queries are runtime-checked (`sqlx::query` / `sqlx::query_as` with
//! `bind`) so the crate builds without a live database.

mod accounts;
mod catalog;
mod contacts;
mod orders;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::store::RepositoryError;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create a `PostgreSQL` connection pool from configuration.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(config.url.expose_secret())
        .await
}

/// Apply pending migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history diverges.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
fn conflict_on_unique(message: &'static str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_owned());
        }
        RepositoryError::Database(e)
    }
}

fn raw_ids<T: Copy + Into<i32>>(ids: impl IntoIterator<Item = T>) -> Vec<i32> {
    ids.into_iter().map(Into::into).collect()
}
