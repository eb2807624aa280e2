//! Persistence seams.
//!
//! Services talk to storage only through the traits below. Two backends
//! implement them: [`crate::db::PgStore`] over `PostgreSQL` and
//! [`MemoryStore`] for tests and local tooling.
//!
//! Every method is one atomic unit of work: either all of its writes are
//! visible afterwards or none are.

mod memory;
pub mod records;

use async_trait::async_trait;
use thiserror::Error;
use tradepost_core::contact::{ContactFields, ContactPatch};
use tradepost_core::feed::IngestionPlan;
use tradepost_core::views::{CategoryShopsView, ShopView};
use tradepost_core::{ContactId, Email, OrderId, OrderItemId, OrderState, UserId};

pub use memory::{CatalogCounts, MemoryStore};
pub use records::*;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The entry at `index` of a batch references a row that does not exist.
    #[error("{entity} referenced by entry {index} does not exist")]
    MissingReference { entity: &'static str, index: usize },

    /// The row belongs to another account.
    #[error("ownership mismatch: {0}")]
    OwnershipMismatch(String),
}

/// Shops, categories, products and listings.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Apply a validated feed for `owner` in one transaction.
    ///
    /// Upserts the shop, its categories, products, listings and parameters,
    /// then removes the shop's listings absent from the feed.
    async fn apply_ingestion(
        &self,
        owner: UserId,
        plan: &IngestionPlan,
    ) -> Result<IngestionReport, RepositoryError>;

    /// All shops ordered by name.
    async fn list_shops(&self) -> Result<Vec<ShopView>, RepositoryError>;

    /// All categories ordered by name, each with its shops.
    async fn list_categories(&self) -> Result<Vec<CategoryShopsView>, RepositoryError>;

    /// Listings matching the filter, with their parameters.
    async fn listing_rows(&self, filter: ListingFilter) -> Result<ListingRows, RepositoryError>;
}

/// Accounts and confirmation tokens.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an inactive account with a pending confirmation token.
    ///
    /// Fails with [`RepositoryError::Conflict`] if the e-mail is taken.
    async fn create_account(
        &self,
        account: &NewAccount,
        token: &str,
    ) -> Result<AccountRecord, RepositoryError>;

    /// Activate the account if `token` is its pending token, consuming it.
    async fn confirm_account(&self, email: &Email, token: &str) -> Result<bool, RepositoryError>;

    async fn get_account(&self, id: UserId) -> Result<Option<AccountRecord>, RepositoryError>;

    async fn get_account_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AccountRecord>, RepositoryError>;
}

/// Delivery contacts, always scoped to their owner.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn create_contact(
        &self,
        user: UserId,
        fields: &ContactFields,
    ) -> Result<ContactRecord, RepositoryError>;

    /// Patch a contact owned by `user`. `None` when no such contact.
    async fn update_contact(
        &self,
        user: UserId,
        id: ContactId,
        patch: &ContactPatch,
    ) -> Result<Option<ContactRecord>, RepositoryError>;

    /// Delete the listed contacts owned by `user`; returns the deleted count.
    async fn delete_contacts(&self, user: UserId, ids: &[ContactId])
    -> Result<u64, RepositoryError>;

    async fn list_contacts(&self, user: UserId) -> Result<Vec<ContactRecord>, RepositoryError>;
}

/// Baskets, orders and their items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Get or create the user's basket and insert every item.
    ///
    /// Unit price, product name, model and shop are copied from the listing.
    /// An unknown listing aborts the whole batch with
    /// [`RepositoryError::MissingReference`].
    async fn add_basket_items(
        &self,
        user: UserId,
        items: &[NewOrderItem],
    ) -> Result<(OrderId, u64), RepositoryError>;

    /// Set quantities of items in the user's basket; returns the updated count.
    async fn update_basket_items(
        &self,
        user: UserId,
        items: &[ItemQuantity],
    ) -> Result<u64, RepositoryError>;

    /// Delete items of the user's basket; returns the deleted count.
    async fn remove_basket_items(
        &self,
        user: UserId,
        ids: &[OrderItemId],
    ) -> Result<u64, RepositoryError>;

    /// Move the user's basket `order` to `new` with `contact` attached.
    ///
    /// Single conditional write: applies only when the order is the user's,
    /// still a basket, has at least one item and `contact` is the user's.
    /// Returns whether the state changed.
    async fn place_order(
        &self,
        user: UserId,
        order: OrderId,
        contact: ContactId,
    ) -> Result<bool, RepositoryError>;

    async fn order_state(&self, order: OrderId) -> Result<Option<OrderState>, RepositoryError>;

    /// Compare-and-set the state of an order. Returns whether it changed.
    async fn transition_order(
        &self,
        order: OrderId,
        from: OrderState,
        to: OrderState,
    ) -> Result<bool, RepositoryError>;

    /// Rows for the orders in `scope`.
    async fn order_rows(&self, scope: OrderScope) -> Result<OrderRows, RepositoryError>;
}

/// A complete backend.
pub trait Store: CatalogStore + AccountStore + ContactStore + OrderStore {}

impl<T> Store for T where T: CatalogStore + AccountStore + ContactStore + OrderStore {}
