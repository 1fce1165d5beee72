//! One end-to-end sync run: marketplace → enrichment → items →
//! payment catalog → merge → snapshot.
//!
//! Runs are expected to be serialized by the invoker (cron, lock file). The
//! snapshot read-then-write and the provider search-then-create are not
//! guarded against a concurrent run.
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument};

use crate::config::Config;
use crate::discogs::Marketplace;
use crate::error::Result;
use crate::inventory;
use crate::model::Inventory;
use crate::reconcile::{self, ReconcileReport};
use crate::stripe::PaymentCatalog;
use crate::transform::to_inventory_item;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub seller: String,
    pub inventory_path: PathBuf,
    /// Pause after each release lookup.
    pub request_delay: Duration,
    /// Pause after each reconciled item.
    pub item_delay: Duration,
}

impl SyncSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            seller: cfg.discogs.seller.clone(),
            inventory_path: cfg.inventory_path(),
            request_delay: cfg.request_delay(),
            item_delay: cfg.item_delay(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub listings: usize,
    pub enriched: usize,
    pub reconcile: Option<ReconcileReport>,
    /// `None` when nothing was written (no listings upstream).
    pub inventory: Option<Inventory>,
}

#[instrument(skip_all, fields(seller = %settings.seller))]
pub async fn run_sync(
    marketplace: &dyn Marketplace,
    catalog: Option<&dyn PaymentCatalog>,
    settings: &SyncSettings,
) -> Result<SyncSummary> {
    let listings = marketplace.fetch_all_listings(&settings.seller).await?;
    info!(total = listings.len(), "fetched listings");

    let mut summary = SyncSummary {
        listings: listings.len(),
        ..Default::default()
    };
    if listings.is_empty() {
        info!("no listings found; leaving inventory untouched");
        return Ok(summary);
    }

    let mut items = Vec::with_capacity(listings.len());
    for (i, listing) in listings.iter().enumerate() {
        info!(
            n = i + 1,
            of = listings.len(),
            listing_id = listing.id,
            "{} - {}",
            listing.release.artist,
            listing.release.title
        );
        let release = marketplace.fetch_release(listing.release.id).await;
        if release.is_some() {
            summary.enriched += 1;
        }
        sleep(settings.request_delay).await;
        items.push(to_inventory_item(listing, release.as_ref()));
    }

    match catalog {
        Some(catalog) => {
            let report = reconcile::sync_all(catalog, &mut items, settings.item_delay).await;
            info!(
                created = report.created,
                unchanged = report.unchanged,
                price_updated = report.price_updated,
                missing_price = report.missing_price,
                failed = report.failed.len(),
                "payment catalog sync finished"
            );
            summary.reconcile = Some(report);
        }
        None => info!("skipping payment catalog sync"),
    }

    let prior = inventory::load(&settings.inventory_path).await;
    let saved = inventory::merge_and_save(
        items,
        prior.as_ref(),
        &settings.seller,
        &settings.inventory_path,
    )
    .await?;
    info!(total = saved.items.len(), "sync complete");
    summary.inventory = Some(saved);
    Ok(summary)
}
