//! Catalog feed ingestion.

use tradepost_core::UserRole;
use tradepost_core::feed::{FeedDocument, FeedLimits};

use crate::error::Result;
use crate::identity::AuthContext;
use crate::store::{CatalogStore, IngestionReport};

/// Ingestion service.
pub struct IngestionService<'a, S: ?Sized> {
    store: &'a S,
    limits: FeedLimits,
}

impl<'a, S> IngestionService<'a, S>
where
    S: CatalogStore + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S, limits: FeedLimits) -> Self {
        Self { store, limits }
    }

    /// Validate `feed` and apply it for the calling shop account.
    ///
    /// Validation happens before any write; the store applies the plan in
    /// one transaction, so a failed run leaves the catalog untouched.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-shop callers or a shop owned by another account,
    /// `Ingestion` for a malformed feed.
    pub async fn ingest(&self, ctx: &AuthContext, feed: FeedDocument) -> Result<IngestionReport> {
        let owner = ctx.require_role(UserRole::Shop)?.user_id;
        let plan = feed.into_plan(&self.limits).inspect_err(|err| {
            tracing::warn!(%owner, error = %err, "Rejected catalog feed");
        })?;
        tracing::debug!(
            %owner,
            shop = %plan.shop,
            goods = plan.goods.len(),
            "Applying catalog feed"
        );
        let report = self.store.apply_ingestion(owner, &plan).await?;
        tracing::info!(
            %owner,
            shop_id = %report.shop_id,
            shop = %report.shop,
            shop_created = report.shop_created,
            categories_created = report.categories_created,
            categories_unlinked = report.categories_unlinked,
            products_created = report.products_created,
            listings_created = report.listings_created,
            listings_updated = report.listings_updated,
            listings_removed = report.listings_removed,
            "Catalog feed ingested"
        );
        Ok(report)
    }
}
