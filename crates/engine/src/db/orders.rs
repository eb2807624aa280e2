//! Baskets, placement and order history.

use std::collections::HashMap;

use async_trait::async_trait;
use tradepost_core::{ContactId, ListingId, OrderId, OrderItemId, OrderState, Price, ShopId, UserId};

use super::catalog::listing_rows_by_id;
use super::{PgStore, raw_ids};
use crate::store::{
    ContactRecord, ItemQuantity, NewOrderItem, OrderItemRecord, OrderRecord, OrderRows,
    OrderScope, OrderStore, RepositoryError,
};

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.state, o.created_at, o.contact_id";

/// Listing fields copied onto a new order item.
#[derive(Debug, sqlx::FromRow)]
struct ListingSnapshot {
    id: ListingId,
    shop_id: ShopId,
    product_name: String,
    model: String,
    price: Price,
}

#[async_trait]
impl OrderStore for PgStore {
    async fn add_basket_items(
        &self,
        user: UserId,
        items: &[NewOrderItem],
    ) -> Result<(OrderId, u64), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let snapshots: HashMap<ListingId, ListingSnapshot> =
            sqlx::query_as::<_, ListingSnapshot>(
                r"
                SELECT l.id, l.shop_id, p.name AS product_name, l.model, l.price
                FROM listings l
                JOIN products p ON p.id = l.product_id
                WHERE l.id = ANY($1)
                FOR SHARE OF l
                ",
            )
            .bind(raw_ids(items.iter().map(|item| item.listing_id)))
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|snapshot| (snapshot.id, snapshot))
            .collect();
        if let Some(index) = items
            .iter()
            .position(|item| !snapshots.contains_key(&item.listing_id))
        {
            return Err(RepositoryError::MissingReference {
                entity: "listing",
                index,
            });
        }

        // The partial unique index turns concurrent first adds into one basket.
        let order_id = sqlx::query_scalar::<_, OrderId>(
            r"
            INSERT INTO orders (user_id, state) VALUES ($1, 'basket')
            ON CONFLICT (user_id) WHERE state = 'basket'
            DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            ",
        )
        .bind(user)
        .fetch_one(&mut *tx)
        .await?;

        let mut created = 0;
        for item in items {
            let Some(snapshot) = snapshots.get(&item.listing_id) else {
                continue;
            };
            created += sqlx::query(
                r"
                INSERT INTO order_items
                    (order_id, listing_id, shop_id, product_name, model, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(order_id)
            .bind(snapshot.id)
            .bind(snapshot.shop_id)
            .bind(&snapshot.product_name)
            .bind(&snapshot.model)
            .bind(snapshot.price)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok((order_id, created))
    }

    async fn update_basket_items(
        &self,
        user: UserId,
        items: &[ItemQuantity],
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;
        for item in items {
            updated += sqlx::query(
                r"
                UPDATE order_items i SET quantity = $1
                FROM orders o
                WHERE i.id = $2 AND i.order_id = o.id
                  AND o.user_id = $3 AND o.state = 'basket'
                ",
            )
            .bind(item.quantity)
            .bind(item.id)
            .bind(user)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(updated)
    }

    async fn remove_basket_items(
        &self,
        user: UserId,
        ids: &[OrderItemId],
    ) -> Result<u64, RepositoryError> {
        Ok(sqlx::query(
            r"
            DELETE FROM order_items i
            USING orders o
            WHERE i.order_id = o.id AND o.user_id = $1 AND o.state = 'basket'
              AND i.id = ANY($2)
            ",
        )
        .bind(user)
        .bind(raw_ids(ids.iter().copied()))
        .execute(&self.pool)
        .await?
        .rows_affected())
    }

    async fn place_order(
        &self,
        user: UserId,
        order: OrderId,
        contact: ContactId,
    ) -> Result<bool, RepositoryError> {
        let placed = sqlx::query(
            r"
            UPDATE orders o SET state = 'new', contact_id = $3
            WHERE o.id = $1 AND o.user_id = $2 AND o.state = 'basket'
              AND EXISTS (SELECT 1 FROM contacts c WHERE c.id = $3 AND c.user_id = $2)
              AND EXISTS (SELECT 1 FROM order_items i WHERE i.order_id = o.id)
            ",
        )
        .bind(order)
        .bind(user)
        .bind(contact)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(placed == 1)
    }

    async fn order_state(&self, order: OrderId) -> Result<Option<OrderState>, RepositoryError> {
        Ok(
            sqlx::query_scalar::<_, OrderState>("SELECT state FROM orders WHERE id = $1")
                .bind(order)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn transition_order(
        &self,
        order: OrderId,
        from: OrderState,
        to: OrderState,
    ) -> Result<bool, RepositoryError> {
        let changed = sqlx::query("UPDATE orders SET state = $3 WHERE id = $1 AND state = $2")
            .bind(order)
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(changed == 1)
    }

    async fn order_rows(&self, scope: OrderScope) -> Result<OrderRows, RepositoryError> {
        let (filter, user) = match scope {
            OrderScope::Basket(user) => ("o.user_id = $1 AND o.state = 'basket'", user),
            OrderScope::History(user) => ("o.user_id = $1 AND o.state <> 'basket'", user),
            OrderScope::Partner(partner) => (
                r"o.state <> 'basket' AND EXISTS (
                    SELECT 1 FROM order_items i
                    JOIN shops s ON s.id = i.shop_id
                    WHERE i.order_id = o.id AND s.owner_id = $1
                )",
                partner,
            ),
        };
        let orders = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE {filter}
             ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        if orders.is_empty() {
            return Ok(OrderRows::default());
        }

        let order_ids = raw_ids(orders.iter().map(|order| order.id));
        let items = sqlx::query_as::<_, OrderItemRecord>(
            r"
            SELECT id, order_id, listing_id, shop_id, product_name, model, unit_price, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await?;

        let listing_ids: Vec<ListingId> = items.iter().filter_map(|item| item.listing_id).collect();
        let listings = listing_rows_by_id(&self.pool, &listing_ids).await?;

        let contact_ids = raw_ids(orders.iter().filter_map(|order| order.contact_id));
        let contacts = sqlx::query_as::<_, ContactRecord>(
            r"
            SELECT id, user_id, city, street, house, structure, building, apartment, phone
            FROM contacts
            WHERE id = ANY($1)
            ",
        )
        .bind(&contact_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(OrderRows {
            orders,
            items,
            listings,
            contacts,
        })
    }
}
