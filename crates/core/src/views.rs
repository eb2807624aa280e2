//! Read projections.
//!
//! Basket, order history and partner orders all share one shape:
//! order → items → listing → product → category, plus the listing's
//! parameters and a total computed from the items when the view is built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contact::ContactFields;
use crate::types::{
    CategoryId, ContactId, Email, ListingId, OrderId, OrderItemId, OrderState, Price, ProductId,
    Quantity, ShopId, UserId, UserRole,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopView {
    pub id: ShopId,
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryView {
    pub id: CategoryId,
    pub name: String,
}

/// A category together with the shops that carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryShopsView {
    pub id: CategoryId,
    pub name: String,
    pub shops: Vec<ShopView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub category: CategoryView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterView {
    pub name: String,
    pub value: String,
}

/// A shop's offer of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingView {
    pub id: ListingId,
    pub external_id: i64,
    pub model: String,
    pub quantity: i32,
    pub price: Price,
    pub price_rrc: Price,
    pub product: ProductView,
    pub shop: ShopView,
    pub parameters: Vec<ParameterView>,
}

/// One order line.
///
/// `unit_price`, `product_name`, `model` and `shop_id` were captured when the
/// item was added; `listing` is the live listing, `None` once the shop has
/// dropped it from its catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemView {
    pub id: OrderItemId,
    pub quantity: Quantity,
    pub unit_price: Price,
    pub line_total: Price,
    pub product_name: String,
    pub model: String,
    pub shop_id: Option<ShopId>,
    pub listing: Option<ListingView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactView {
    pub id: ContactId,
    #[serde(flatten)]
    pub fields: ContactFields,
}

/// A basket or a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
    pub contact: Option<ContactView>,
    pub items: Vec<OrderItemView>,
    pub total: Price,
}

impl OrderView {
    /// Build the view, computing the total from the items.
    #[must_use]
    pub fn new(
        id: OrderId,
        state: OrderState,
        created_at: DateTime<Utc>,
        contact: Option<ContactView>,
        items: Vec<OrderItemView>,
    ) -> Self {
        let total = items.iter().map(|item| item.line_total).sum();
        Self {
            id,
            state,
            created_at,
            contact,
            items,
            total,
        }
    }
}

/// An account and its delivery contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub position: String,
    pub role: UserRole,
    pub contacts: Vec<ContactView>,
}

/// Success envelope for write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteStatus {
    pub status: bool,
    /// Rows created, updated or deleted.
    pub affected: u64,
}

impl WriteStatus {
    #[must_use]
    pub const fn affected(affected: u64) -> Self {
        Self {
            status: true,
            affected,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, price: i64, quantity: i64) -> OrderItemView {
        let unit_price = Price::new(price).unwrap();
        let quantity = Quantity::new(quantity).unwrap();
        OrderItemView {
            id: OrderItemId::new(id),
            quantity,
            unit_price,
            line_total: unit_price.line_total(quantity),
            product_name: "p".to_owned(),
            model: String::new(),
            shop_id: None,
            listing: None,
        }
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        let view = OrderView::new(
            OrderId::new(1),
            OrderState::Basket,
            Utc::now(),
            None,
            vec![item(1, 100, 2), item(2, 50, 1)],
        );
        assert_eq!(view.total.amount(), 250);
    }

    #[test]
    fn test_empty_order_total_is_zero() {
        let view = OrderView::new(OrderId::new(1), OrderState::New, Utc::now(), None, vec![]);
        assert_eq!(view.total, Price::ZERO);
    }

    #[test]
    fn test_contact_view_is_flat() {
        let view = ContactView {
            id: ContactId::new(3),
            fields: ContactFields {
                city: "Tver".to_owned(),
                ..ContactFields::default()
            },
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["city"], "Tver");
    }

    #[test]
    fn test_write_status_shape() {
        let json = serde_json::to_value(WriteStatus::affected(2)).unwrap();
        assert_eq!(json, serde_json::json!({"status": true, "affected": 2}));
    }
}
