//! Catalog queries and feed application.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tradepost_core::feed::IngestionPlan;
use tradepost_core::views::{CategoryShopsView, ShopView};
use tradepost_core::{CategoryId, ListingId, ProductId, ShopId, UserId};

use super::{PgStore, raw_ids};
use crate::store::{
    CatalogStore, IngestionReport, ListingFilter, ListingRecord, ListingRows,
    ParameterValueRecord, RepositoryError,
};

const LISTING_SELECT: &str = r"
    SELECT l.id, l.external_id, l.model, l.quantity, l.price, l.price_rrc,
           p.id AS product_id, p.name AS product_name,
           c.id AS category_id, c.name AS category_name,
           s.id AS shop_id, s.name AS shop_name, s.url AS shop_url
    FROM listings l
    JOIN products p ON p.id = l.product_id
    JOIN categories c ON c.id = p.category_id
    JOIN shops s ON s.id = l.shop_id
";

#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    id: ShopId,
    name: String,
    url: Option<String>,
}

impl From<ShopRow> for ShopView {
    fn from(row: ShopRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            url: row.url,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryShopRow {
    category_id: CategoryId,
    #[sqlx(flatten)]
    shop: ShopRow,
}

#[derive(Debug, sqlx::FromRow)]
struct UpsertedShop {
    id: ShopId,
    owner_id: Option<UserId>,
    inserted: bool,
}

/// Id of an upserted row and whether the upsert inserted it.
#[derive(Debug, sqlx::FromRow)]
struct Upserted {
    id: i32,
    inserted: bool,
}

/// Listings with the given ids plus their parameters.
pub(super) async fn listing_rows_by_id(
    pool: &PgPool,
    ids: &[ListingId],
) -> Result<ListingRows, RepositoryError> {
    if ids.is_empty() {
        return Ok(ListingRows::default());
    }
    let ids = raw_ids(ids.iter().copied());
    let listings = sqlx::query_as::<_, ListingRecord>(&format!(
        "{LISTING_SELECT} WHERE l.id = ANY($1) ORDER BY l.id"
    ))
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    let parameters = parameter_rows(pool, &ids).await?;
    Ok(ListingRows {
        listings,
        parameters,
    })
}

async fn parameter_rows(
    pool: &PgPool,
    listing_ids: &[i32],
) -> Result<Vec<ParameterValueRecord>, RepositoryError> {
    Ok(sqlx::query_as::<_, ParameterValueRecord>(
        r"
        SELECT lp.listing_id, pr.name, lp.value
        FROM listing_parameters lp
        JOIN parameters pr ON pr.id = lp.parameter_id
        WHERE lp.listing_id = ANY($1)
        ORDER BY lp.listing_id, pr.name
        ",
    )
    .bind(listing_ids)
    .fetch_all(pool)
    .await?)
}

async fn upsert_named(
    conn: &mut PgConnection,
    table: &'static str,
    name: &str,
) -> Result<Upserted, RepositoryError> {
    // `table` is always one of our own literals.
    Ok(sqlx::query_as::<_, Upserted>(&format!(
        "INSERT INTO {table} (name) VALUES ($1)
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
         RETURNING id, (xmax = 0) AS inserted"
    ))
    .bind(name)
    .fetch_one(conn)
    .await?)
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn apply_ingestion(
        &self,
        owner: UserId,
        plan: &IngestionPlan,
    ) -> Result<IngestionReport, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let shop = sqlx::query_as::<_, UpsertedShop>(
            r"
            INSERT INTO shops (name, url, owner_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
               SET url = COALESCE(EXCLUDED.url, shops.url),
                   owner_id = COALESCE(shops.owner_id, EXCLUDED.owner_id)
            RETURNING id, owner_id, (xmax = 0) AS inserted
            ",
        )
        .bind(&plan.shop)
        .bind(plan.url.as_deref())
        .bind(owner)
        .fetch_one(&mut *tx)
        .await?;
        if shop.owner_id != Some(owner) {
            // Dropping `tx` rolls back the URL change above.
            return Err(RepositoryError::OwnershipMismatch(format!(
                "shop {} belongs to another account",
                plan.shop
            )));
        }

        let mut report = IngestionReport {
            shop_id: shop.id,
            shop: plan.shop.clone(),
            shop_created: shop.inserted,
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
            let category = upsert_named(&mut tx, "categories", name).await?;
            if category.inserted {
                report.categories_created += 1;
            }
            let category_id = CategoryId::new(category.id);
            report.categories_linked += sqlx::query(
                "INSERT INTO shop_categories (shop_id, category_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(shop.id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            category_ids.insert(name.as_str(), category_id);
        }
        report.categories_unlinked = sqlx::query(
            "DELETE FROM shop_categories WHERE shop_id = $1 AND NOT (category_id = ANY($2))",
        )
        .bind(shop.id)
        .bind(raw_ids(category_ids.values().copied()))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let mut kept: HashSet<ListingId> = HashSet::with_capacity(plan.goods.len());
        for good in &plan.goods {
            let category_id = *category_ids.get(good.category.as_str()).ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "good {} refers to undeclared category {}",
                    good.name, good.category
                ))
            })?;

            let product = sqlx::query_as::<_, Upserted>(
                r"
                INSERT INTO products (name, category_id) VALUES ($1, $2)
                ON CONFLICT (name, category_id) DO UPDATE SET name = EXCLUDED.name
                RETURNING id, (xmax = 0) AS inserted
                ",
            )
            .bind(&good.name)
            .bind(category_id)
            .fetch_one(&mut *tx)
            .await?;
            if product.inserted {
                report.products_created += 1;
            }

            let listing = sqlx::query_as::<_, Upserted>(
                r"
                INSERT INTO listings
                    (product_id, shop_id, external_id, model, quantity, price, price_rrc)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (product_id, shop_id, external_id) DO UPDATE
                   SET model = EXCLUDED.model,
                       quantity = EXCLUDED.quantity,
                       price = EXCLUDED.price,
                       price_rrc = EXCLUDED.price_rrc
                RETURNING id, (xmax = 0) AS inserted
                ",
            )
            .bind(ProductId::new(product.id))
            .bind(shop.id)
            .bind(good.external_id)
            .bind(&good.model)
            .bind(good.quantity)
            .bind(good.price)
            .bind(good.price_rrc)
            .fetch_one(&mut *tx)
            .await?;
            if listing.inserted {
                report.listings_created += 1;
            } else {
                report.listings_updated += 1;
            }
            let listing_id = ListingId::new(listing.id);
            kept.insert(listing_id);

            sqlx::query("DELETE FROM listing_parameters WHERE listing_id = $1")
                .bind(listing_id)
                .execute(&mut *tx)
                .await?;
            for (name, value) in &good.parameters {
                let parameter = upsert_named(&mut tx, "parameters", name).await?;
                if parameter.inserted {
                    report.parameters_created += 1;
                }
                sqlx::query(
                    "INSERT INTO listing_parameters (listing_id, parameter_id, value)
                     VALUES ($1, $2, $3)",
                )
                .bind(listing_id)
                .bind(parameter.id)
                .bind(value)
                .execute(&mut *tx)
                .await?;
                report.listing_parameters += 1;
            }
        }

        // Order items keep their snapshot; the FK sets their listing to NULL.
        report.listings_removed =
            sqlx::query("DELETE FROM listings WHERE shop_id = $1 AND NOT (id = ANY($2))")
                .bind(shop.id)
                .bind(raw_ids(kept))
                .execute(&mut *tx)
                .await?
                .rows_affected();

        tx.commit().await?;
        Ok(report)
    }

    async fn list_shops(&self) -> Result<Vec<ShopView>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopRow>("SELECT id, name, url FROM shops ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ShopView::from).collect())
    }

    async fn list_categories(&self) -> Result<Vec<CategoryShopsView>, RepositoryError> {
        let categories = sqlx::query_as::<_, (CategoryId, String)>(
            "SELECT id, name FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        let links = sqlx::query_as::<_, CategoryShopRow>(
            r"
            SELECT sc.category_id, s.id, s.name, s.url
            FROM shop_categories sc
            JOIN shops s ON s.id = sc.shop_id
            ORDER BY s.name
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut shops: HashMap<CategoryId, Vec<ShopView>> = HashMap::new();
        for link in links {
            shops
                .entry(link.category_id)
                .or_default()
                .push(link.shop.into());
        }
        Ok(categories
            .into_iter()
            .map(|(id, name)| CategoryShopsView {
                id,
                name,
                shops: shops.remove(&id).unwrap_or_default(),
            })
            .collect())
    }

    async fn listing_rows(&self, filter: ListingFilter) -> Result<ListingRows, RepositoryError> {
        let listings = sqlx::query_as::<_, ListingRecord>(&format!(
            "{LISTING_SELECT}
             WHERE ($1::INTEGER IS NULL OR l.shop_id = $1)
               AND ($2::INTEGER IS NULL OR p.category_id = $2)
             ORDER BY l.id"
        ))
        .bind(filter.shop_id)
        .bind(filter.category_id)
        .fetch_all(&self.pool)
        .await?;
        let ids = raw_ids(listings.iter().map(|listing| listing.id));
        let parameters = parameter_rows(&self.pool, &ids).await?;
        Ok(ListingRows {
            listings,
            parameters,
        })
    }
}
