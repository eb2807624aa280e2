//! Flat rows exchanged between the stores and the services.
//!
//! Stores return rows; [`crate::query`] turns them into nested views. Both
//! store backends produce the same rows, so view assembly is shared.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tradepost_core::contact::ContactFields;
use tradepost_core::{
    CategoryId, ContactId, Email, ListingId, OrderId, OrderItemId, OrderState, Price, ProductId,
    Quantity, ShopId, UserId, UserRole,
};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AccountRecord {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub position: String,
    pub role: UserRole,
    pub active: bool,
}

/// Data for a new account. Accounts start inactive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub position: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ContactRecord {
    pub id: ContactId,
    pub user_id: UserId,
    #[sqlx(flatten)]
    pub fields: ContactFields,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
    pub contact_id: Option<ContactId>,
}

/// An order line with the listing data captured when it was added.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderItemRecord {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub listing_id: Option<ListingId>,
    pub shop_id: Option<ShopId>,
    pub product_name: String,
    pub model: String,
    pub unit_price: Price,
    pub quantity: Quantity,
}

/// A listing joined with its product, category and shop.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ListingRecord {
    pub id: ListingId,
    pub external_id: i64,
    pub model: String,
    pub quantity: i32,
    pub price: Price,
    pub price_rrc: Price,
    pub product_id: ProductId,
    pub product_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub shop_id: ShopId,
    pub shop_name: String,
    pub shop_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ParameterValueRecord {
    pub listing_id: ListingId,
    pub name: String,
    pub value: String,
}

/// Listings plus their parameter values.
#[derive(Debug, Clone, Default)]
pub struct ListingRows {
    pub listings: Vec<ListingRecord>,
    pub parameters: Vec<ParameterValueRecord>,
}

/// Everything needed to assemble a set of order views.
#[derive(Debug, Clone, Default)]
pub struct OrderRows {
    pub orders: Vec<OrderRecord>,
    pub items: Vec<OrderItemRecord>,
    pub listings: ListingRows,
    pub contacts: Vec<ContactRecord>,
}

/// Which orders to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// The user's basket, if any.
    Basket(UserId),
    /// The user's placed orders.
    History(UserId),
    /// Placed orders containing an item from a shop owned by this account.
    Partner(UserId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub shop_id: Option<ShopId>,
    pub category_id: Option<CategoryId>,
}

impl ListingFilter {
    /// Whether a listing passes every supplied filter.
    #[must_use]
    pub fn matches(&self, shop_id: ShopId, category_id: CategoryId) -> bool {
        self.shop_id.is_none_or(|id| id == shop_id)
            && self.category_id.is_none_or(|id| id == category_id)
    }
}

/// A basket line to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub listing_id: ListingId,
    pub quantity: Quantity,
}

/// A basket line quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemQuantity {
    pub id: OrderItemId,
    pub quantity: Quantity,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub shop_id: ShopId,
    pub shop: String,
    pub shop_created: bool,
    pub categories_created: u64,
    pub categories_linked: u64,
    pub categories_unlinked: u64,
    pub products_created: u64,
    pub listings_created: u64,
    pub listings_updated: u64,
    pub listings_removed: u64,
    pub parameters_created: u64,
    pub listing_parameters: u64,
}
