//! In-memory store.
//!
//! Keeps every table behind one `parking_lot::Mutex`. Each trait method runs
//! in a single critical section, which gives the same all-or-nothing
//! behavior as a database transaction. Ingestion works on a copy of the
//! tables and swaps it in only when the whole plan applied.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tradepost_core::contact::{ContactFields, ContactPatch};
use tradepost_core::feed::IngestionPlan;
use tradepost_core::views::{CategoryShopsView, ShopView};
use tradepost_core::{
    CategoryId, ContactId, Email, ListingId, OrderId, OrderItemId, OrderState, ParameterId, Price,
    ProductId, ShopId, UserId,
};

use super::{
    AccountRecord, AccountStore, CatalogStore, ContactRecord, ContactStore, IngestionReport,
    ItemQuantity, ListingFilter, ListingRecord, ListingRows, NewAccount, NewOrderItem,
    OrderItemRecord, OrderRecord, OrderRows, OrderScope, OrderStore, ParameterValueRecord,
    RepositoryError,
};

#[derive(Debug, Clone)]
struct ShopRow {
    name: String,
    url: Option<String>,
    owner_id: Option<UserId>,
}

#[derive(Debug, Clone)]
struct ProductRow {
    name: String,
    category_id: CategoryId,
}

#[derive(Debug, Clone)]
struct ListingRow {
    product_id: ProductId,
    shop_id: ShopId,
    external_id: i64,
    model: String,
    quantity: i32,
    price: Price,
    price_rrc: Price,
}

/// Last id handed out per table.
#[derive(Debug, Clone, Default)]
struct Sequences {
    account: i32,
    shop: i32,
    category: i32,
    product: i32,
    listing: i32,
    parameter: i32,
    contact: i32,
    order: i32,
    item: i32,
}

fn bump(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone, Default)]
struct Tables {
    seq: Sequences,
    accounts: BTreeMap<UserId, AccountRecord>,
    tokens: HashMap<UserId, String>,
    shops: BTreeMap<ShopId, ShopRow>,
    categories: BTreeMap<CategoryId, String>,
    shop_categories: BTreeSet<(ShopId, CategoryId)>,
    products: BTreeMap<ProductId, ProductRow>,
    listings: BTreeMap<ListingId, ListingRow>,
    parameters: BTreeMap<ParameterId, String>,
    listing_parameters: BTreeMap<(ListingId, ParameterId), String>,
    contacts: BTreeMap<ContactId, ContactRecord>,
    orders: BTreeMap<OrderId, OrderRecord>,
    items: BTreeMap<OrderItemId, OrderItemRecord>,
}

/// Row counts of the catalog tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    pub shops: usize,
    pub categories: usize,
    pub shop_categories: usize,
    pub products: usize,
    pub listings: usize,
    pub parameters: usize,
    pub listing_parameters: usize,
}

/// Store backed by in-process tables. Cloning shares the tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current catalog table sizes.
    #[must_use]
    pub fn catalog_counts(&self) -> CatalogCounts {
        let t = self.tables.lock();
        CatalogCounts {
            shops: t.shops.len(),
            categories: t.categories.len(),
            shop_categories: t.shop_categories.len(),
            products: t.products.len(),
            listings: t.listings.len(),
            parameters: t.parameters.len(),
            listing_parameters: t.listing_parameters.len(),
        }
    }

    /// Number of the user's orders currently in `state`.
    #[must_use]
    pub fn count_orders(&self, user: UserId, state: OrderState) -> usize {
        self.tables
            .lock()
            .orders
            .values()
            .filter(|o| o.user_id == user && o.state == state)
            .count()
    }
}

impl Tables {
    fn basket_of(&self, user: UserId) -> Option<OrderId> {
        self.orders
            .values()
            .find(|o| o.user_id == user && o.state == OrderState::Basket)
            .map(|o| o.id)
    }

    fn listing_record(&self, id: ListingId) -> Option<ListingRecord> {
        let listing = self.listings.get(&id)?;
        let product = self.products.get(&listing.product_id)?;
        let category = self.categories.get(&product.category_id)?;
        let shop = self.shops.get(&listing.shop_id)?;
        Some(ListingRecord {
            id,
            external_id: listing.external_id,
            model: listing.model.clone(),
            quantity: listing.quantity,
            price: listing.price,
            price_rrc: listing.price_rrc,
            product_id: listing.product_id,
            product_name: product.name.clone(),
            category_id: product.category_id,
            category_name: category.clone(),
            shop_id: listing.shop_id,
            shop_name: shop.name.clone(),
            shop_url: shop.url.clone(),
        })
    }

    fn listing_rows(&self, ids: impl IntoIterator<Item = ListingId>) -> ListingRows {
        let ids: BTreeSet<ListingId> = ids.into_iter().collect();
        let listings = ids
            .iter()
            .filter_map(|id| self.listing_record(*id))
            .collect();
        let parameters = self
            .listing_parameters
            .iter()
            .filter(|((listing_id, _), _)| ids.contains(listing_id))
            .filter_map(|((listing_id, parameter_id), value)| {
                self.parameters
                    .get(parameter_id)
                    .map(|name| ParameterValueRecord {
                        listing_id: *listing_id,
                        name: name.clone(),
                        value: value.clone(),
                    })
            })
            .collect();
        ListingRows {
            listings,
            parameters,
        }
    }

    fn ingest(
        &mut self,
        owner: UserId,
        plan: &IngestionPlan,
    ) -> Result<IngestionReport, RepositoryError> {
        let existing = self
            .shops
            .iter_mut()
            .find(|(_, shop)| shop.name == plan.shop);
        let (shop_id, shop_created) = match existing {
            Some((id, shop)) => {
                if shop.owner_id.is_some_and(|current| current != owner) {
                    return Err(RepositoryError::OwnershipMismatch(format!(
                        "shop {} belongs to another account",
                        plan.shop
                    )));
                }
                shop.owner_id = Some(owner);
                if plan.url.is_some() {
                    shop.url.clone_from(&plan.url);
                }
                (*id, false)
            }
            None => {
                let id = ShopId::new(bump(&mut self.seq.shop));
                self.shops.insert(
                    id,
                    ShopRow {
                        name: plan.shop.clone(),
                        url: plan.url.clone(),
                        owner_id: Some(owner),
                    },
                );
                (id, true)
            }
        };

        let mut report = IngestionReport {
            shop_id,
            shop: plan.shop.clone(),
            shop_created,
            categories_created: 0,
            categories_linked: 0,
            categories_unlinked: 0,
            products_created: 0,
            listings_created: 0,
            listings_updated: 0,
            listings_removed: 0,
            parameters_created: 0,
            listing_parameters: 0,
        };

        let mut category_ids: HashMap<&str, CategoryId> = HashMap::new();
        for name in &plan.categories {
            let found = self
                .categories
                .iter()
                .find(|(_, existing)| *existing == name)
                .map(|(id, _)| *id);
            let id = found.unwrap_or_else(|| {
                let id = CategoryId::new(bump(&mut self.seq.category));
                self.categories.insert(id, name.clone());
                report.categories_created += 1;
                id
            });
            if self.shop_categories.insert((shop_id, id)) {
                report.categories_linked += 1;
            }
            category_ids.insert(name.as_str(), id);
        }
        let declared: HashSet<CategoryId> = category_ids.values().copied().collect();
        let linked = self.shop_categories.len();
        self.shop_categories
            .retain(|(shop, category)| *shop != shop_id || declared.contains(category));
        report.categories_unlinked = (linked - self.shop_categories.len()) as u64;

        let mut kept: HashSet<ListingId> = HashSet::new();
        for good in &plan.goods {
            let category_id = *category_ids.get(good.category.as_str()).ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "good {} refers to undeclared category {}",
                    good.name, good.category
                ))
            })?;

            let found = self
                .products
                .iter()
                .find(|(_, p)| p.name == good.name && p.category_id == category_id)
                .map(|(id, _)| *id);
            let product_id = found.unwrap_or_else(|| {
                let id = ProductId::new(bump(&mut self.seq.product));
                self.products.insert(
                    id,
                    ProductRow {
                        name: good.name.clone(),
                        category_id,
                    },
                );
                report.products_created += 1;
                id
            });

            let row = ListingRow {
                product_id,
                shop_id,
                external_id: good.external_id,
                model: good.model.clone(),
                quantity: good.quantity,
                price: good.price,
                price_rrc: good.price_rrc,
            };
            let found = self
                .listings
                .iter()
                .find(|(_, l)| {
                    l.product_id == product_id
                        && l.shop_id == shop_id
                        && l.external_id == good.external_id
                })
                .map(|(id, _)| *id);
            let listing_id = if let Some(id) = found {
                self.listings.insert(id, row);
                report.listings_updated += 1;
                id
            } else {
                let id = ListingId::new(bump(&mut self.seq.listing));
                self.listings.insert(id, row);
                report.listings_created += 1;
                id
            };
            kept.insert(listing_id);

            self.listing_parameters
                .retain(|(listing, _), _| *listing != listing_id);
            for (name, value) in &good.parameters {
                let found = self
                    .parameters
                    .iter()
                    .find(|(_, existing)| *existing == name)
                    .map(|(id, _)| *id);
                let parameter_id = found.unwrap_or_else(|| {
                    let id = ParameterId::new(bump(&mut self.seq.parameter));
                    self.parameters.insert(id, name.clone());
                    report.parameters_created += 1;
                    id
                });
                self.listing_parameters
                    .insert((listing_id, parameter_id), value.clone());
                report.listing_parameters += 1;
            }
        }

        let stale: Vec<ListingId> = self
            .listings
            .iter()
            .filter(|(id, l)| l.shop_id == shop_id && !kept.contains(*id))
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            self.listings.remove(id);
            self.listing_parameters.retain(|(listing, _), _| listing != id);
            for item in self.items.values_mut() {
                if item.listing_id == Some(*id) {
                    item.listing_id = None;
                }
            }
        }
        report.listings_removed = stale.len() as u64;

        Ok(report)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn apply_ingestion(
        &self,
        owner: UserId,
        plan: &IngestionPlan,
    ) -> Result<IngestionReport, RepositoryError> {
        let mut tables = self.tables.lock();
        let mut staged = tables.clone();
        let report = staged.ingest(owner, plan)?;
        *tables = staged;
        Ok(report)
    }

    async fn list_shops(&self) -> Result<Vec<ShopView>, RepositoryError> {
        let t = self.tables.lock();
        let mut shops: Vec<ShopView> = t
            .shops
            .iter()
            .map(|(id, shop)| ShopView {
                id: *id,
                name: shop.name.clone(),
                url: shop.url.clone(),
            })
            .collect();
        shops.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(shops)
    }

    async fn list_categories(&self) -> Result<Vec<CategoryShopsView>, RepositoryError> {
        let t = self.tables.lock();
        let mut categories: Vec<CategoryShopsView> = t
            .categories
            .iter()
            .map(|(id, name)| {
                let mut shops: Vec<ShopView> = t
                    .shop_categories
                    .iter()
                    .filter(|(_, category)| category == id)
                    .filter_map(|(shop_id, _)| {
                        t.shops.get(shop_id).map(|shop| ShopView {
                            id: *shop_id,
                            name: shop.name.clone(),
                            url: shop.url.clone(),
                        })
                    })
                    .collect();
                shops.sort_by(|a, b| a.name.cmp(&b.name));
                CategoryShopsView {
                    id: *id,
                    name: name.clone(),
                    shops,
                }
            })
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn listing_rows(&self, filter: ListingFilter) -> Result<ListingRows, RepositoryError> {
        let t = self.tables.lock();
        let ids: Vec<ListingId> = t
            .listings
            .iter()
            .filter(|(_, listing)| {
                t.products
                    .get(&listing.product_id)
                    .is_some_and(|product| filter.matches(listing.shop_id, product.category_id))
            })
            .map(|(id, _)| *id)
            .collect();
        Ok(t.listing_rows(ids))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(
        &self,
        account: &NewAccount,
        token: &str,
    ) -> Result<AccountRecord, RepositoryError> {
        let mut t = self.tables.lock();
        if t.accounts.values().any(|a| a.email == account.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let id = UserId::new(bump(&mut t.seq.account));
        let record = AccountRecord {
            id,
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            company: account.company.clone(),
            position: account.position.clone(),
            role: account.role,
            active: false,
        };
        t.accounts.insert(id, record.clone());
        t.tokens.insert(id, token.to_owned());
        Ok(record)
    }

    async fn confirm_account(&self, email: &Email, token: &str) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock();
        let Some(id) = t
            .accounts
            .values()
            .find(|a| &a.email == email)
            .map(|a| a.id)
        else {
            return Ok(false);
        };
        if t.tokens.get(&id).is_none_or(|pending| pending != token) {
            return Ok(false);
        }
        t.tokens.remove(&id);
        if let Some(account) = t.accounts.get_mut(&id) {
            account.active = true;
        }
        Ok(true)
    }

    async fn get_account(&self, id: UserId) -> Result<Option<AccountRecord>, RepositoryError> {
        Ok(self.tables.lock().accounts.get(&id).cloned())
    }

    async fn get_account_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AccountRecord>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .accounts
            .values()
            .find(|a| &a.email == email)
            .cloned())
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn create_contact(
        &self,
        user: UserId,
        fields: &ContactFields,
    ) -> Result<ContactRecord, RepositoryError> {
        let mut t = self.tables.lock();
        if !t.accounts.contains_key(&user) {
            return Err(RepositoryError::NotFound);
        }
        let id = ContactId::new(bump(&mut t.seq.contact));
        let record = ContactRecord {
            id,
            user_id: user,
            fields: fields.clone(),
        };
        t.contacts.insert(id, record.clone());
        Ok(record)
    }

    async fn update_contact(
        &self,
        user: UserId,
        id: ContactId,
        patch: &ContactPatch,
    ) -> Result<Option<ContactRecord>, RepositoryError> {
        let mut t = self.tables.lock();
        let Some(contact) = t.contacts.get_mut(&id).filter(|c| c.user_id == user) else {
            return Ok(None);
        };
        patch.clone().apply(&mut contact.fields);
        Ok(Some(contact.clone()))
    }

    async fn delete_contacts(
        &self,
        user: UserId,
        ids: &[ContactId],
    ) -> Result<u64, RepositoryError> {
        let mut t = self.tables.lock();
        let owned: Vec<ContactId> = ids
            .iter()
            .copied()
            .filter(|id| t.contacts.get(id).is_some_and(|c| c.user_id == user))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        for id in &owned {
            t.contacts.remove(id);
            for order in t.orders.values_mut() {
                if order.contact_id == Some(*id) {
                    order.contact_id = None;
                }
            }
        }
        Ok(owned.len() as u64)
    }

    async fn list_contacts(&self, user: UserId) -> Result<Vec<ContactRecord>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .contacts
            .values()
            .filter(|c| c.user_id == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn add_basket_items(
        &self,
        user: UserId,
        items: &[NewOrderItem],
    ) -> Result<(OrderId, u64), RepositoryError> {
        let mut t = self.tables.lock();
        let mut snapshots = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let listing = t
                .listing_record(item.listing_id)
                .ok_or(RepositoryError::MissingReference {
                    entity: "listing",
                    index,
                })?;
            snapshots.push((listing, item.quantity));
        }

        let order_id = if let Some(id) = t.basket_of(user) {
            id
        } else {
            let id = OrderId::new(bump(&mut t.seq.order));
            t.orders.insert(
                id,
                OrderRecord {
                    id,
                    user_id: user,
                    state: OrderState::Basket,
                    created_at: Utc::now(),
                    contact_id: None,
                },
            );
            id
        };

        for (listing, quantity) in snapshots {
            let id = OrderItemId::new(bump(&mut t.seq.item));
            t.items.insert(
                id,
                OrderItemRecord {
                    id,
                    order_id,
                    listing_id: Some(listing.id),
                    shop_id: Some(listing.shop_id),
                    product_name: listing.product_name,
                    model: listing.model,
                    unit_price: listing.price,
                    quantity,
                },
            );
        }
        Ok((order_id, items.len() as u64))
    }

    async fn update_basket_items(
        &self,
        user: UserId,
        items: &[ItemQuantity],
    ) -> Result<u64, RepositoryError> {
        let mut t = self.tables.lock();
        let Some(basket) = t.basket_of(user) else {
            return Ok(0);
        };
        let mut updated = 0;
        for change in items {
            if let Some(item) = t
                .items
                .get_mut(&change.id)
                .filter(|item| item.order_id == basket)
            {
                item.quantity = change.quantity;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn remove_basket_items(
        &self,
        user: UserId,
        ids: &[OrderItemId],
    ) -> Result<u64, RepositoryError> {
        let mut t = self.tables.lock();
        let Some(basket) = t.basket_of(user) else {
            return Ok(0);
        };
        let mut removed = 0;
        for id in ids {
            if t.items.get(id).is_some_and(|item| item.order_id == basket) {
                t.items.remove(id);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn place_order(
        &self,
        user: UserId,
        order: OrderId,
        contact: ContactId,
    ) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock();
        let contact_owned = t.contacts.get(&contact).is_some_and(|c| c.user_id == user);
        let has_items = t.items.values().any(|item| item.order_id == order);
        let Some(record) = t
            .orders
            .get_mut(&order)
            .filter(|o| o.user_id == user && o.state == OrderState::Basket)
        else {
            return Ok(false);
        };
        if !contact_owned || !has_items {
            return Ok(false);
        }
        record.state = OrderState::New;
        record.contact_id = Some(contact);
        Ok(true)
    }

    async fn order_state(&self, order: OrderId) -> Result<Option<OrderState>, RepositoryError> {
        Ok(self.tables.lock().orders.get(&order).map(|o| o.state))
    }

    async fn transition_order(
        &self,
        order: OrderId,
        from: OrderState,
        to: OrderState,
    ) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock();
        match t.orders.get_mut(&order) {
            Some(record) if record.state == from => {
                record.state = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn order_rows(&self, scope: OrderScope) -> Result<OrderRows, RepositoryError> {
        let t = self.tables.lock();
        let orders: Vec<OrderRecord> = match scope {
            OrderScope::Basket(user) => t
                .orders
                .values()
                .filter(|o| o.user_id == user && o.state == OrderState::Basket)
                .cloned()
                .collect(),
            OrderScope::History(user) => t
                .orders
                .values()
                .filter(|o| o.user_id == user && o.state != OrderState::Basket)
                .cloned()
                .collect(),
            OrderScope::Partner(partner) => {
                let shops: HashSet<ShopId> = t
                    .shops
                    .iter()
                    .filter(|(_, shop)| shop.owner_id == Some(partner))
                    .map(|(id, _)| *id)
                    .collect();
                let matching: HashSet<OrderId> = t
                    .items
                    .values()
                    .filter(|item| item.shop_id.is_some_and(|shop| shops.contains(&shop)))
                    .map(|item| item.order_id)
                    .collect();
                t.orders
                    .values()
                    .filter(|o| o.state != OrderState::Basket && matching.contains(&o.id))
                    .cloned()
                    .collect()
            }
        };

        let order_ids: HashSet<OrderId> = orders.iter().map(|o| o.id).collect();
        let items: Vec<OrderItemRecord> = t
            .items
            .values()
            .filter(|item| order_ids.contains(&item.order_id))
            .cloned()
            .collect();
        let listings = t.listing_rows(items.iter().filter_map(|item| item.listing_id));
        let contacts = orders
            .iter()
            .filter_map(|o| o.contact_id)
            .filter_map(|id| t.contacts.get(&id).cloned())
            .collect();

        Ok(OrderRows {
            orders,
            items,
            listings,
            contacts,
        })
    }
}
