//! Catalog feed ingestion from a YAML file.
//!
//! # Usage
//!
//! ```bash
//! tradepost ingest --owner shop@example.com feeds/shop1.yaml
//! ```
//!
//! The owner must be an active `shop` account. The ingestion report is
//! printed to stdout as JSON.

use std::path::Path;

use tradepost_core::feed::FeedDocument;
use tradepost_engine::services::{AccountService, IngestionService};
use tradepost_engine::{AuthContext, TracingSink};

use super::{CommandError, connect, print_json};

/// Ingest the feed at `path` for the account `owner`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the owner does not
/// exist, or the feed is rejected.
pub async fn run(owner: &str, path: &Path) -> Result<(), CommandError> {
    // Parse before connecting so a broken file fails fast.
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let feed: FeedDocument = serde_yaml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        shop = %feed.shop,
        goods = feed.goods.len(),
        "Parsed feed"
    );

    let (config, store) = connect().await?;
    let sink = TracingSink;
    let ctx = AccountService::new(&store, &sink).resolve_email(owner).await?;
    if ctx == AuthContext::Anonymous {
        return Err(CommandError::UnknownAccount(owner.to_owned()));
    }

    let report = IngestionService::new(&store, config.feed)
        .ingest(&ctx, feed)
        .await?;
    print_json(&report)
}
