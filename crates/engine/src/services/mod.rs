//! Operations exposed to outer layers.
//!
//! Each service borrows a store (and, where events are emitted, a
//! notification sink) and takes the caller's [`AuthContext`] explicitly.
//!
//! [`AuthContext`]: crate::identity::AuthContext

mod accounts;
mod basket;
mod catalog;
mod contacts;
mod fulfillment;
mod ingest;
mod orders;
mod partner;

pub use accounts::{AccountService, RegistrationInput};
pub use basket::{BasketItemInput, BasketItemUpdate, BasketService};
pub use catalog::CatalogService;
pub use contacts::ContactService;
pub use fulfillment::{FulfillmentService, TransitionOutcome};
pub use ingest::IngestionService;
pub use orders::{OrderService, PlacementOutcome};
pub use partner::PartnerService;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use serde_json::json;
    use tradepost_core::feed::{FeedDocument, FeedLimits};
    use tradepost_core::{Email, ListingId, UserRole};

    use super::{CatalogService, IngestionService};
    use crate::identity::{AuthContext, Principal};
    use crate::store::{AccountStore, CatalogStore, ListingFilter, NewAccount};

    const TOKEN: &str = "test-token";

    /// Register and confirm an account, returning its context.
    pub async fn account<S: AccountStore + ?Sized>(
        store: &S,
        email: &str,
        role: UserRole,
    ) -> AuthContext {
        let email = Email::parse(email).unwrap();
        let record = store
            .create_account(
                &NewAccount {
                    email: email.clone(),
                    first_name: "Test".to_owned(),
                    last_name: "User".to_owned(),
                    company: String::new(),
                    position: String::new(),
                    role,
                },
                TOKEN,
            )
            .await
            .unwrap();
        assert!(store.confirm_account(&email, TOKEN).await.unwrap());
        AuthContext::Authenticated(Principal {
            user_id: record.id,
            role,
            active: true,
        })
    }

    pub async fn buyer<S: AccountStore + ?Sized>(store: &S, email: &str) -> AuthContext {
        account(store, email, UserRole::Buyer).await
    }

    pub async fn shop<S: AccountStore + ?Sized>(store: &S, email: &str) -> AuthContext {
        account(store, email, UserRole::Shop).await
    }

    /// Ingest one good per price into `shop_name` for `owner`; returns the
    /// listing ids in feed order.
    pub async fn listings<S: CatalogStore + ?Sized>(
        store: &S,
        owner: &AuthContext,
        shop_name: &str,
        prices: &[i64],
    ) -> Vec<ListingId> {
        let goods: Vec<_> = prices
            .iter()
            .enumerate()
            .map(|(index, price)| {
                json!({
                    "id": index,
                    "category": "Phones",
                    "name": format!("{shop_name} phone {index}"),
                    "price": price,
                    "price_rrc": price,
                    "quantity": 10,
                })
            })
            .collect();
        let feed: FeedDocument = serde_json::from_value(json!({
            "shop": shop_name,
            "categories": [{"name": "Phones"}],
            "goods": goods,
        }))
        .unwrap();
        let report = IngestionService::new(store, FeedLimits::default())
            .ingest(owner, feed)
            .await
            .unwrap();
        let mut found = CatalogService::new(store)
            .search_listings(ListingFilter {
                shop_id: Some(report.shop_id),
                category_id: None,
            })
            .await
            .unwrap();
        found.sort_by_key(|listing| listing.external_id);
        found.into_iter().map(|listing| listing.id).collect()
    }
}
