//! Read-only catalog browsing.

use tradepost_core::views::{CategoryShopsView, ListingView, ShopView};

use crate::error::Result;
use crate::query::assemble_listings;
use crate::store::{CatalogStore, ListingFilter};

/// Catalog service. Browsing needs no caller identity.
pub struct CatalogService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CatalogService<'a, S>
where
    S: CatalogStore + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn list_shops(&self) -> Result<Vec<ShopView>> {
        Ok(self.store.list_shops().await?)
    }

    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn list_categories(&self) -> Result<Vec<CategoryShopsView>> {
        Ok(self.store.list_categories().await?)
    }

    /// Listings matching every supplied filter, fully expanded.
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn search_listings(&self, filter: ListingFilter) -> Result<Vec<ListingView>> {
        let rows = self.store.listing_rows(filter).await?;
        let listings = assemble_listings(rows);
        tracing::debug!(
            shop_id = ?filter.shop_id,
            category_id = ?filter.category_id,
            count = listings.len(),
            "Searched listings"
        );
        Ok(listings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;
    use tradepost_core::feed::{FeedDocument, FeedLimits};

    use super::*;
    use crate::services::IngestionService;
    use crate::services::testing::shop;
    use crate::store::MemoryStore;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let feeds = [
            ("one@example.com", "Alpha", json!([
                {"id": 1, "category": "Phones", "name": "A1", "price": 10, "price_rrc": 12, "quantity": 1},
                {"id": 2, "category": "Cases", "name": "A2", "price": 5, "price_rrc": 6, "quantity": 1},
            ])),
            ("two@example.com", "Beta", json!([
                {"id": 1, "category": "Phones", "name": "B1", "price": 11, "price_rrc": 13, "quantity": 2,
                 "parameters": {"RAM": 4}},
            ])),
        ];
        for (email, name, goods) in feeds {
            let ctx = shop(&store, email).await;
            let feed: FeedDocument = serde_json::from_value(json!({
                "shop": name,
                "categories": [{"name": "Phones"}, {"name": "Cases"}],
                "goods": goods,
            }))
            .unwrap();
            IngestionService::new(&store, FeedLimits::default())
                .ingest(&ctx, feed)
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_shops_and_categories_sorted_by_name() {
        let store = seeded().await;
        let service = CatalogService::new(&store);
        let shops: Vec<_> = service
            .list_shops()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(shops, ["Alpha", "Beta"]);

        let categories = service.list_categories().await.unwrap();
        assert_eq!(categories[0].name, "Cases");
        assert_eq!(categories[0].shops.len(), 2);
        assert_eq!(categories[1].name, "Phones");
    }

    #[tokio::test]
    async fn test_search_filters_combine() {
        let store = seeded().await;
        let service = CatalogService::new(&store);
        let all = service.search_listings(ListingFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let alpha = all.iter().find(|l| l.shop.name == "Alpha").unwrap().shop.id;
        let phones = all
            .iter()
            .find(|l| l.product.category.name == "Phones")
            .unwrap()
            .product
            .category
            .id;
        let both = service
            .search_listings(ListingFilter {
                shop_id: Some(alpha),
                category_id: Some(phones),
            })
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].product.name, "A1");

        let beta = all.iter().find(|l| l.shop.name == "Beta").unwrap();
        assert_eq!(beta.parameters[0].name, "RAM");
        assert_eq!(beta.parameters[0].value, "4");
    }
}
