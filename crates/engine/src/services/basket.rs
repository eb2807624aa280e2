//! Basket operations.
//!
//! The basket is the caller's single order in `basket` state. Adding is
//! strict (one bad entry rejects the call); updating is tolerant (bad entries
//! are skipped) so bulk clients can send partially stale data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tradepost_core::views::{OrderView, WriteStatus};
use tradepost_core::{ListingId, OrderItemId, Quantity, UserId, ValidationErrors, parse_id_list};

use crate::error::{Result, ServiceError};
use crate::identity::AuthContext;
use crate::query::assemble_orders;
use crate::store::{ItemQuantity, NewOrderItem, OrderScope, OrderStore, RepositoryError};

/// An entry of an add-items request.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct BasketItemInput {
    pub listing_id: Option<i64>,
    pub quantity: Option<i64>,
}

impl BasketItemInput {
    #[must_use]
    pub const fn new(listing_id: i64, quantity: i64) -> Self {
        Self {
            listing_id: Some(listing_id),
            quantity: Some(quantity),
        }
    }
}

/// An entry of an update-items request, kept as raw JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BasketItemUpdate {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub quantity: Value,
}

impl BasketItemUpdate {
    #[must_use]
    pub fn new(id: i64, quantity: i64) -> Self {
        Self {
            id: Value::from(id),
            quantity: Value::from(quantity),
        }
    }

    fn parse(&self) -> Option<ItemQuantity> {
        let id = i32::try_from(self.id.as_i64()?).ok().filter(|id| *id > 0)?;
        let quantity = Quantity::new(self.quantity.as_i64()?)?;
        Some(ItemQuantity {
            id: OrderItemId::new(id),
            quantity,
        })
    }
}

/// Basket service.
pub struct BasketService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> BasketService<'a, S>
where
    S: OrderStore + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The caller's basket with items expanded, or `None` if there is none yet.
    ///
    /// # Errors
    ///
    /// Returns an authentication error or a store failure.
    pub async fn get_basket(&self, ctx: &AuthContext) -> Result<Option<OrderView>> {
        let user = ctx.require_user()?.user_id;
        let rows = self.store.order_rows(OrderScope::Basket(user)).await?;
        let basket = assemble_orders(rows).into_iter().next();
        tracing::debug!(%user, found = basket.is_some(), "Loaded basket");
        Ok(basket)
    }

    /// Add every entry to the caller's basket, creating the basket if needed.
    ///
    /// Each entry becomes its own line. Nothing is written unless every
    /// entry is valid and refers to an existing listing.
    ///
    /// # Errors
    ///
    /// `Validation` naming `items[i].listing_id` / `items[i].quantity`.
    pub async fn add_items(
        &self,
        ctx: &AuthContext,
        items: &[BasketItemInput],
    ) -> Result<WriteStatus> {
        let user = ctx.require_user()?.user_id;
        if items.is_empty() {
            return Err(ValidationErrors::single("items", "at least one item is required").into());
        }

        let mut errors = ValidationErrors::new();
        let mut lines = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let listing_id = match item.listing_id {
                None => {
                    errors.push(format!("items[{index}].listing_id"), "this field is required");
                    None
                }
                Some(raw) => {
                    let id = i32::try_from(raw).ok().filter(|id| *id > 0);
                    if id.is_none() {
                        errors.push(
                            format!("items[{index}].listing_id"),
                            "must be a positive listing id",
                        );
                    }
                    id.map(ListingId::new)
                }
            };
            let quantity = item.quantity.and_then(Quantity::new);
            if quantity.is_none() {
                errors.push(
                    format!("items[{index}].quantity"),
                    "must be a positive integer",
                );
            }
            if let (Some(listing_id), Some(quantity)) = (listing_id, quantity) {
                lines.push(NewOrderItem {
                    listing_id,
                    quantity,
                });
            }
        }
        if !errors.is_empty() {
            tracing::warn!(%user, errors = %errors, "Rejected basket items");
            return Err(errors.into());
        }

        let (order_id, created) = self
            .store
            .add_basket_items(user, &lines)
            .await
            .map_err(|err| match err {
                RepositoryError::MissingReference { index, .. } => {
                    ServiceError::from(ValidationErrors::single(
                        format!("items[{index}].listing_id"),
                        "listing does not exist",
                    ))
                }
                other => other.into(),
            })?;
        tracing::info!(%user, %order_id, created, "Added basket items");
        Ok(WriteStatus::affected(created))
    }

    /// Set quantities of items in the caller's basket.
    ///
    /// Entries whose id or quantity is not a positive JSON integer, and ids
    /// outside the caller's basket, are skipped.
    ///
    /// # Errors
    ///
    /// `Validation` when the list is empty.
    pub async fn update_items(
        &self,
        ctx: &AuthContext,
        items: &[BasketItemUpdate],
    ) -> Result<WriteStatus> {
        let user = ctx.require_user()?.user_id;
        if items.is_empty() {
            return Err(ValidationErrors::single("items", "at least one item is required").into());
        }
        let changes: Vec<ItemQuantity> = items.iter().filter_map(BasketItemUpdate::parse).collect();
        let skipped = items.len() - changes.len();
        let updated = if changes.is_empty() {
            0
        } else {
            self.store.update_basket_items(user, &changes).await?
        };
        tracing::info!(%user, updated, skipped, "Updated basket items");
        Ok(WriteStatus::affected(updated))
    }

    /// Delete items from the caller's basket by raw id tokens.
    ///
    /// Tokens that are not plain digits are ignored.
    ///
    /// # Errors
    ///
    /// `Validation` when no token is a valid id.
    pub async fn remove_items<T: AsRef<str> + Sync>(
        &self,
        ctx: &AuthContext,
        tokens: &[T],
    ) -> Result<WriteStatus> {
        let user = ctx.require_user()?.user_id;
        let ids: Vec<OrderItemId> = tokens
            .iter()
            .filter_map(|token| OrderItemId::parse_digits(token.as_ref().trim()))
            .collect();
        self.remove_ids(user, ids).await
    }

    /// [`BasketService::remove_items`] for a comma-separated list.
    ///
    /// # Errors
    ///
    /// `Validation` when no token is a valid id.
    pub async fn remove_items_csv(&self, ctx: &AuthContext, raw: &str) -> Result<WriteStatus> {
        let user = ctx.require_user()?.user_id;
        let ids = parse_id_list(raw, OrderItemId::parse_digits);
        self.remove_ids(user, ids).await
    }

    async fn remove_ids(&self, user: UserId, ids: Vec<OrderItemId>) -> Result<WriteStatus> {
        if ids.is_empty() {
            return Err(ValidationErrors::single("items", "no valid item ids supplied").into());
        }
        let removed = self.store.remove_basket_items(user, &ids).await?;
        tracing::info!(%user, requested = ids.len(), removed, "Removed basket items");
        Ok(WriteStatus::affected(removed))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::services::testing::{buyer, listings, shop};
    use crate::store::MemoryStore;

    fn raw(id: ListingId) -> i64 {
        i64::from(id.as_i32())
    }

    #[test]
    fn test_update_entry_parsing_is_tolerant() {
        let parse = |id: Value, quantity: Value| BasketItemUpdate { id, quantity }.parse();
        assert!(parse(json!(3), json!(2)).is_some());
        assert!(parse(json!("3"), json!(2)).is_none());
        assert!(parse(json!(3), json!(2.5)).is_none());
        assert!(parse(json!(3), json!(0)).is_none());
        assert!(parse(json!(-1), json!(1)).is_none());
        assert!(parse(Value::Null, json!(1)).is_none());
    }

    #[test]
    fn test_add_input_deserializes_missing_fields() {
        let input: BasketItemInput = serde_json::from_value(json!({"listing_id": 4})).unwrap();
        assert_eq!(input.listing_id, Some(4));
        assert_eq!(input.quantity, None);
    }

    #[tokio::test]
    async fn test_add_is_strict() {
        let store = MemoryStore::new();
        let seller = shop(&store, "shop@example.com").await;
        let ids = listings(&store, &seller, "Alpha", &[100]).await;
        let ctx = buyer(&store, "buyer@example.com").await;
        let service = BasketService::new(&store);

        let err = service
            .add_items(
                &ctx,
                &[
                    BasketItemInput::new(raw(ids[0]), 1),
                    BasketItemInput {
                        listing_id: None,
                        quantity: Some(0),
                    },
                ],
            )
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["items[1].listing_id", "items[1].quantity"]);
        assert!(service.get_basket(&ctx).await.unwrap().is_none());

        let err = service
            .add_items(
                &ctx,
                &[BasketItemInput::new(raw(ids[0]), 1), BasketItemInput::new(9_999, 1)],
            )
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(errors.errors()[0].field, "items[1].listing_id");
        assert!(service.get_basket(&ctx).await.unwrap().is_none());

        let err = service.add_items(&ctx, &[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_entries_are_not_merged() {
        let store = MemoryStore::new();
        let seller = shop(&store, "shop@example.com").await;
        let ids = listings(&store, &seller, "Alpha", &[100, 50]).await;
        let ctx = buyer(&store, "buyer@example.com").await;
        let service = BasketService::new(&store);

        let status = service
            .add_items(
                &ctx,
                &[
                    BasketItemInput::new(raw(ids[0]), 2),
                    BasketItemInput::new(raw(ids[0]), 1),
                    BasketItemInput::new(raw(ids[1]), 1),
                ],
            )
            .await
            .unwrap();
        assert_eq!(status.affected, 3);

        let basket = service.get_basket(&ctx).await.unwrap().unwrap();
        assert_eq!(basket.items.len(), 3);
        assert_eq!(basket.total.amount(), 350);
    }

    #[tokio::test]
    async fn test_update_skips_bad_entries() {
        let store = MemoryStore::new();
        let seller = shop(&store, "shop@example.com").await;
        let ids = listings(&store, &seller, "Alpha", &[100]).await;
        let ctx = buyer(&store, "buyer@example.com").await;
        let other = buyer(&store, "other@example.com").await;
        let service = BasketService::new(&store);
        service
            .add_items(&ctx, &[BasketItemInput::new(raw(ids[0]), 1)])
            .await
            .unwrap();
        let item = service.get_basket(&ctx).await.unwrap().unwrap().items[0].id;
        let item_id = i64::from(item.as_i32());

        let updates = [
            BasketItemUpdate::new(item_id, 4),
            BasketItemUpdate {
                id: json!("x"),
                quantity: json!(1),
            },
            BasketItemUpdate::new(item_id, 0),
        ];
        let status = service.update_items(&ctx, &updates).await.unwrap();
        assert_eq!(status.affected, 1);
        let basket = service.get_basket(&ctx).await.unwrap().unwrap();
        assert_eq!(basket.items[0].quantity.get(), 4);
        assert_eq!(basket.total.amount(), 400);

        let status = service
            .update_items(&other, &[BasketItemUpdate::new(item_id, 9)])
            .await
            .unwrap();
        assert_eq!(status.affected, 0);
    }

    #[tokio::test]
    async fn test_remove_csv() {
        let store = MemoryStore::new();
        let seller = shop(&store, "shop@example.com").await;
        let ids = listings(&store, &seller, "Alpha", &[100, 50]).await;
        let ctx = buyer(&store, "buyer@example.com").await;
        let service = BasketService::new(&store);
        service
            .add_items(
                &ctx,
                &[BasketItemInput::new(raw(ids[0]), 1), BasketItemInput::new(raw(ids[1]), 1)],
            )
            .await
            .unwrap();
        let basket = service.get_basket(&ctx).await.unwrap().unwrap();
        let raw_ids = format!("{}, abc", basket.items[0].id);

        let status = service.remove_items_csv(&ctx, &raw_ids).await.unwrap();
        assert_eq!(status.affected, 1);
        let basket = service.get_basket(&ctx).await.unwrap().unwrap();
        assert_eq!(basket.items.len(), 1);
        assert_eq!(basket.total.amount(), 50);

        let err = service.remove_items_csv(&ctx, "abc").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
