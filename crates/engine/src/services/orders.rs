//! Order placement and history.

use serde::Serialize;
use tradepost_core::views::OrderView;
use tradepost_core::{ContactId, OrderId};

use crate::error::Result;
use crate::identity::AuthContext;
use crate::notify::{Notification, NotificationSink};
use crate::query::assemble_orders;
use crate::store::{OrderScope, OrderStore};

/// Result of a placement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementOutcome {
    /// The basket became a `new` order and a notification was sent.
    Placed,
    /// Nothing changed: not the caller's basket, already placed, empty, or
    /// the contact is not the caller's.
    Unchanged,
}

/// Order service.
pub struct OrderService<'a, S: ?Sized, N: ?Sized> {
    store: &'a S,
    notifier: &'a N,
}

impl<'a, S, N> OrderService<'a, S, N>
where
    S: OrderStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S, notifier: &'a N) -> Self {
        Self { store, notifier }
    }

    /// Place the caller's basket `order_id` for delivery to `contact_id`.
    ///
    /// The state change is one conditional write, so concurrent attempts
    /// place the order at most once. The `NewOrder` event is emitted only
    /// when this call changed the state.
    ///
    /// # Errors
    ///
    /// Returns an authentication error or a store failure.
    pub async fn place(
        &self,
        ctx: &AuthContext,
        order_id: OrderId,
        contact_id: ContactId,
    ) -> Result<PlacementOutcome> {
        let user_id = ctx.require_user()?.user_id;
        if !self.store.place_order(user_id, order_id, contact_id).await? {
            tracing::warn!(%user_id, %order_id, %contact_id, "Order placement had no effect");
            return Ok(PlacementOutcome::Unchanged);
        }
        tracing::info!(%user_id, %order_id, %contact_id, "Order placed");
        self.notifier
            .notify(Notification::NewOrder { user_id, order_id })
            .await;
        Ok(PlacementOutcome::Placed)
    }

    /// The caller's placed orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an authentication error or a store failure.
    pub async fn list(&self, ctx: &AuthContext) -> Result<Vec<OrderView>> {
        let user = ctx.require_user()?.user_id;
        let rows = self.store.order_rows(OrderScope::History(user)).await?;
        let orders = assemble_orders(rows);
        tracing::debug!(%user, count = orders.len(), "Listed orders");
        Ok(orders)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use tradepost_core::contact::ContactInput;
    use tradepost_core::OrderState;

    use super::*;
    use crate::notify::MemorySink;
    use crate::services::testing::{buyer, listings, shop};
    use crate::services::{BasketItemInput, BasketService, ContactService};
    use crate::store::MemoryStore;

    async fn contact(store: &MemoryStore, ctx: &AuthContext) -> ContactId {
        ContactService::new(store)
            .create(
                ctx,
                ContactInput {
                    city: Some("Moscow".to_owned()),
                    street: Some("Tverskaya".to_owned()),
                    phone: Some("+7 495 000-00-00".to_owned()),
                    ..ContactInput::default()
                },
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_place_once_notifies_once() {
        let store = MemoryStore::new();
        let sink = MemorySink::new();
        let seller = shop(&store, "shop@example.com").await;
        let ids = listings(&store, &seller, "Alpha", &[100]).await;
        let ctx = buyer(&store, "buyer@example.com").await;
        let basket = BasketService::new(&store);
        basket
            .add_items(&ctx, &[BasketItemInput::new(i64::from(ids[0].as_i32()), 2)])
            .await
            .unwrap();
        let order_id = basket.get_basket(&ctx).await.unwrap().unwrap().id;
        let contact_id = contact(&store, &ctx).await;

        let service = OrderService::new(&store, &sink);
        let first = service.place(&ctx, order_id, contact_id).await.unwrap();
        let second = service.place(&ctx, order_id, contact_id).await.unwrap();
        assert_eq!(first, PlacementOutcome::Placed);
        assert_eq!(second, PlacementOutcome::Unchanged);

        let user_id = ctx.require_user().unwrap().user_id;
        assert_eq!(sink.events(), vec![Notification::NewOrder { user_id, order_id }]);

        let history = service.list(&ctx).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].state, OrderState::New);
        assert_eq!(history[0].total.amount(), 200);
        assert_eq!(history[0].contact.as_ref().unwrap().id, contact_id);
        assert!(basket.get_basket(&ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_place_rejects_foreign_contact_and_empty_basket() {
        let store = MemoryStore::new();
        let sink = MemorySink::new();
        let seller = shop(&store, "shop@example.com").await;
        let ids = listings(&store, &seller, "Alpha", &[100]).await;
        let alice = buyer(&store, "alice@example.com").await;
        let bob = buyer(&store, "bob@example.com").await;
        let bobs_contact = contact(&store, &bob).await;
        let alices_contact = contact(&store, &alice).await;

        let basket = BasketService::new(&store);
        basket
            .add_items(&alice, &[BasketItemInput::new(i64::from(ids[0].as_i32()), 1)])
            .await
            .unwrap();
        let view = basket.get_basket(&alice).await.unwrap().unwrap();

        let service = OrderService::new(&store, &sink);
        let outcome = service.place(&alice, view.id, bobs_contact).await.unwrap();
        assert_eq!(outcome, PlacementOutcome::Unchanged);
        let outcome = service.place(&bob, view.id, bobs_contact).await.unwrap();
        assert_eq!(outcome, PlacementOutcome::Unchanged);

        let item = view.items[0].id.to_string();
        basket.remove_items(&alice, &[item.as_str()]).await.unwrap();
        let outcome = service.place(&alice, view.id, alices_contact).await.unwrap();
        assert_eq!(outcome, PlacementOutcome::Unchanged);
        assert!(sink.events().is_empty());
        let alice_id = alice.require_user().unwrap().user_id;
        assert_eq!(store.count_orders(alice_id, OrderState::New), 0);
    }

    #[tokio::test]
    async fn test_anonymous_cannot_list() {
        let store = MemoryStore::new();
        let sink = MemorySink::new();
        let err = OrderService::new(&store, &sink)
            .list(&AuthContext::Anonymous)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::ServiceError::Unauthenticated));
    }
}
