//! Post-placement state changes, driven by fulfillment tooling.

use serde::Serialize;
use tradepost_core::{OrderId, OrderState};

use crate::error::{Result, ServiceError};
use crate::store::OrderStore;

/// Result of a transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    Applied { from: OrderState, to: OrderState },
    /// The order changed state between the read and the write.
    Unchanged,
}

/// Fulfillment service.
pub struct FulfillmentService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> FulfillmentService<'a, S>
where
    S: OrderStore + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Move `order_id` to `next` if the lifecycle allows it.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown order, `Conflict` for an illegal transition.
    pub async fn advance(&self, order_id: OrderId, next: OrderState) -> Result<TransitionOutcome> {
        let current = self
            .store
            .order_state(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))?;
        if current == OrderState::Basket || !current.can_transition_to(next) {
            tracing::warn!(%order_id, %current, %next, "Rejected order transition");
            return Err(ServiceError::Conflict(format!(
                "order {order_id} cannot move from {current} to {next}"
            )));
        }
        if !self.store.transition_order(order_id, current, next).await? {
            tracing::warn!(%order_id, %current, %next, "Order changed concurrently");
            return Ok(TransitionOutcome::Unchanged);
        }
        tracing::info!(%order_id, from = %current, to = %next, "Order advanced");
        Ok(TransitionOutcome::Applied {
            from: current,
            to: next,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tradepost_core::contact::ContactInput;

    use super::*;
    use crate::notify::MemorySink;
    use crate::services::testing::{buyer, listings, shop};
    use crate::services::{BasketItemInput, BasketService, ContactService, OrderService};
    use crate::store::MemoryStore;

    async fn placed_order(store: &MemoryStore) -> OrderId {
        let seller = shop(store, "shop@example.com").await;
        let ids = listings(store, &seller, "Alpha", &[10]).await;
        let ctx = buyer(store, "buyer@example.com").await;
        let basket = BasketService::new(store);
        let listing = ids.first().copied().unwrap();
        basket
            .add_items(&ctx, &[BasketItemInput::new(i64::from(listing.as_i32()), 1)])
            .await
            .unwrap();
        let order_id = basket.get_basket(&ctx).await.unwrap().unwrap().id;
        let contact = ContactService::new(store)
            .create(
                &ctx,
                ContactInput {
                    city: Some("Omsk".to_owned()),
                    street: Some("Mira".to_owned()),
                    phone: Some("123".to_owned()),
                    ..ContactInput::default()
                },
            )
            .await
            .unwrap();
        OrderService::new(store, &MemorySink::new())
            .place(&ctx, order_id, contact.id)
            .await
            .unwrap();
        order_id
    }

    #[tokio::test]
    async fn test_advance_through_lifecycle() {
        let store = MemoryStore::new();
        let order_id = placed_order(&store).await;
        let service = FulfillmentService::new(&store);

        for next in [
            OrderState::Confirmed,
            OrderState::Assembled,
            OrderState::Sent,
            OrderState::Delivered,
        ] {
            let outcome = service.advance(order_id, next).await.unwrap();
            assert!(matches!(outcome, TransitionOutcome::Applied { to, .. } if to == next));
        }

        let err = service
            .advance(order_id, OrderState::Canceled)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_skipping_steps_conflicts() {
        let store = MemoryStore::new();
        let order_id = placed_order(&store).await;
        let service = FulfillmentService::new(&store);
        let err = service.advance(order_id, OrderState::Sent).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let outcome = service.advance(order_id, OrderState::Canceled).await.unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::Applied {
                from: OrderState::New,
                to: OrderState::Canceled
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let store = MemoryStore::new();
        let err = FulfillmentService::new(&store)
            .advance(OrderId::new(404), OrderState::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
