//! Row → view assembly shared by every store backend.
//!
//! Stores fetch flat rows (orders, items, listings, parameters, contacts) in
//! a handful of queries; the functions here stitch them into the nested
//! [`OrderView`] and [`ListingView`] projections.

use std::collections::HashMap;

use tradepost_core::views::{
    CategoryView, ContactView, ListingView, OrderItemView, OrderView, ParameterView, ProductView,
    ShopView,
};
use tradepost_core::{ContactId, ListingId, OrderId};

use crate::store::{ListingRecord, ListingRows, OrderRows};

/// Build listing views in id order, each with its parameters sorted by name.
#[must_use]
pub fn assemble_listings(rows: ListingRows) -> Vec<ListingView> {
    let mut by_listing = group_parameters(rows.parameters);
    let mut listings: Vec<ListingView> = rows
        .listings
        .into_iter()
        .map(|record| {
            let parameters = by_listing.remove(&record.id).unwrap_or_default();
            listing_view(record, parameters)
        })
        .collect();
    listings.sort_by_key(|listing| listing.id);
    listings
}

/// Build order views, newest first.
///
/// Items keep their insertion order. A missing listing leaves the item's
/// `listing` empty; a missing contact leaves the order's `contact` empty.
#[must_use]
pub fn assemble_orders(rows: OrderRows) -> Vec<OrderView> {
    let listings: HashMap<ListingId, ListingView> = assemble_listings(rows.listings)
        .into_iter()
        .map(|listing| (listing.id, listing))
        .collect();
    let contacts: HashMap<ContactId, ContactView> = rows
        .contacts
        .into_iter()
        .map(|record| {
            (
                record.id,
                ContactView {
                    id: record.id,
                    fields: record.fields,
                },
            )
        })
        .collect();

    let mut items_by_order: HashMap<OrderId, Vec<OrderItemView>> = HashMap::new();
    let mut items = rows.items;
    items.sort_by_key(|item| item.id);
    for item in items {
        let listing = item.listing_id.and_then(|id| listings.get(&id).cloned());
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemView {
                id: item.id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.unit_price.line_total(item.quantity),
                product_name: item.product_name,
                model: item.model,
                shop_id: item.shop_id,
                listing,
            });
    }

    let mut orders: Vec<OrderView> = rows
        .orders
        .into_iter()
        .map(|order| {
            let contact = order.contact_id.and_then(|id| contacts.get(&id).cloned());
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            OrderView::new(order.id, order.state, order.created_at, contact, items)
        })
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders
}

fn group_parameters(
    parameters: Vec<crate::store::ParameterValueRecord>,
) -> HashMap<ListingId, Vec<ParameterView>> {
    let mut grouped: HashMap<ListingId, Vec<ParameterView>> = HashMap::new();
    for parameter in parameters {
        grouped
            .entry(parameter.listing_id)
            .or_default()
            .push(ParameterView {
                name: parameter.name,
                value: parameter.value,
            });
    }
    for values in grouped.values_mut() {
        values.sort_by(|a, b| a.name.cmp(&b.name));
    }
    grouped
}

fn listing_view(record: ListingRecord, parameters: Vec<ParameterView>) -> ListingView {
    ListingView {
        id: record.id,
        external_id: record.external_id,
        model: record.model,
        quantity: record.quantity,
        price: record.price,
        price_rrc: record.price_rrc,
        product: ProductView {
            id: record.product_id,
            name: record.product_name,
            category: CategoryView {
                id: record.category_id,
                name: record.category_name,
            },
        },
        shop: ShopView {
            id: record.shop_id,
            name: record.shop_name,
            url: record.shop_url,
        },
        parameters,
    }
}
