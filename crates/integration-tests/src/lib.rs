//! Scenario tests for Tradepost.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tradepost-integration-tests
//! ```
//!
//! Scenarios run against [`MemoryStore`], which gives every store operation
//! the same all-or-nothing behavior as the `PostgreSQL` backend.
//!
//! # Test Categories
//!
//! - `catalog_ingestion` - feed validation, idempotent re-runs, browsing
//! - `basket_orders` - basket edits, totals, placement, fulfillment
//! - `isolation` - one account never sees or changes another's data
//! - `contacts` - contact lifecycle and bulk deletion

#![allow(clippy::unwrap_used)]

use tradepost_core::contact::ContactInput;
use tradepost_core::feed::{FeedDocument, FeedLimits};
use tradepost_core::{ContactId, ListingId, UserRole};
use tradepost_engine::services::{
    AccountService, CatalogService, ContactService, IngestionService, RegistrationInput,
};
use tradepost_engine::store::{IngestionReport, ListingFilter};
use tradepost_engine::{AuthContext, MemorySink, MemoryStore, Notification};

/// The sample shop feed.
pub const SHOP1_YAML: &str = include_str!("../fixtures/shop1.yaml");

/// Parse [`SHOP1_YAML`].
#[must_use]
pub fn shop1_feed() -> FeedDocument {
    serde_yaml::from_str(SHOP1_YAML).unwrap()
}

/// A marketplace backed by in-memory tables.
#[derive(Debug, Clone, Default)]
pub struct Marketplace {
    pub store: MemoryStore,
    pub sink: MemorySink,
}

impl Marketplace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and confirm an account through the account service.
    pub async fn account(&self, email: &str, role: UserRole) -> AuthContext {
        let service = AccountService::new(&self.store, &self.sink);
        let account = service
            .register(RegistrationInput {
                email: Some(email.to_owned()),
                first_name: Some("Test".to_owned()),
                last_name: Some("Account".to_owned()),
                role: Some(role.to_string()),
                ..RegistrationInput::default()
            })
            .await
            .unwrap();
        let token = self
            .sink
            .events()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                Notification::AccountRegistered { user_id, token, .. } if user_id == account.id => {
                    Some(token)
                }
                _ => None,
            })
            .unwrap();
        service.confirm(email, &token).await.unwrap();
        service.resolve(account.id).await.unwrap()
    }

    pub async fn buyer(&self, email: &str) -> AuthContext {
        self.account(email, UserRole::Buyer).await
    }

    pub async fn shop(&self, email: &str) -> AuthContext {
        self.account(email, UserRole::Shop).await
    }

    /// Ingest `feed` as `owner`.
    pub async fn ingest(&self, owner: &AuthContext, feed: FeedDocument) -> IngestionReport {
        IngestionService::new(&self.store, FeedLimits::default())
            .ingest(owner, feed)
            .await
            .unwrap()
    }

    /// Listing ids ordered by feed-local external id.
    pub async fn listing_ids(&self) -> Vec<ListingId> {
        let mut listings = CatalogService::new(&self.store)
            .search_listings(ListingFilter::default())
            .await
            .unwrap();
        listings.sort_by_key(|listing| listing.external_id);
        listings.into_iter().map(|listing| listing.id).collect()
    }

    /// Create a contact for `ctx`.
    pub async fn contact(&self, ctx: &AuthContext, city: &str) -> ContactId {
        ContactService::new(&self.store)
            .create(
                ctx,
                ContactInput {
                    city: Some(city.to_owned()),
                    street: Some("Тверская".to_owned()),
                    house: Some("7".to_owned()),
                    phone: Some("+7 495 123-45-67".to_owned()),
                    ..ContactInput::default()
                },
            )
            .await
            .unwrap()
            .id
    }
}

/// Raw request value of a listing id.
#[must_use]
pub fn raw(id: ListingId) -> i64 {
    i64::from(id.as_i32())
}
