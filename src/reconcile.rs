//! Find-or-create of provider products and prices for inventory items.
//!
//! Search-then-create is not atomic against the provider. Callers must
//! ensure a single reconciliation run per catalog at a time; two concurrent
//! runs can both miss the search and double-create a product.
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::model::InventoryItem;
use crate::stripe::{NewPrice, NewProduct, PaymentCatalog, LISTING_ID_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Unchanged,
    PriceUpdated,
    /// Product exists but has no active price; price id left unset.
    MissingPrice,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub unchanged: usize,
    pub price_updated: usize,
    pub missing_price: usize,
    pub failed: Vec<u64>,
}

/// Price in integer minor units (cents), rounded to the nearest unit.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn new_product_for(item: &InventoryItem) -> NewProduct {
    let description = item
        .comments
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| format!("{} / {}", item.condition, item.sleeve_condition));

    let mut metadata = BTreeMap::new();
    metadata.insert(
        LISTING_ID_KEY.to_string(),
        item.discogs_listing_id.to_string(),
    );
    metadata.insert(
        "discogs_release_id".to_string(),
        item.discogs_release_id.to_string(),
    );
    metadata.insert("condition".to_string(), item.condition.clone());
    metadata.insert("sleeve_condition".to_string(), item.sleeve_condition.clone());

    NewProduct {
        name: item.display_name(),
        description,
        metadata,
        images: item.images.first().cloned().into_iter().collect(),
    }
}

fn new_price_for(item: &InventoryItem, product_id: &str) -> NewPrice {
    NewPrice {
        product: product_id.to_string(),
        unit_amount: to_minor_units(item.price),
        currency: item.currency.to_lowercase(),
    }
}

/// Reconcile one item, populating its provider ids. On error the item's
/// ids are left untouched.
#[instrument(skip_all, fields(listing_id = item.discogs_listing_id))]
pub async fn sync_item(catalog: &dyn PaymentCatalog, item: &mut InventoryItem) -> Result<SyncOutcome> {
    let (product_id, price_id, outcome) = resolve_ids(catalog, item)
        .await
        .map_err(|err| SyncError::Reconciliation {
            listing_id: item.discogs_listing_id,
            reason: err.to_string(),
        })?;
    item.stripe_product_id = Some(product_id);
    item.stripe_price_id = price_id;
    Ok(outcome)
}

async fn resolve_ids(
    catalog: &dyn PaymentCatalog,
    item: &InventoryItem,
) -> Result<(String, Option<String>, SyncOutcome)> {
    let Some(product) = catalog.find_product_by_listing(item.discogs_listing_id).await? else {
        info!(item = %item.display_name(), "creating product");
        let product = catalog.create_product(&new_product_for(item)).await?;
        let price = catalog.create_price(&new_price_for(item, &product.id)).await?;
        return Ok((product.id, Some(price.id), SyncOutcome::Created));
    };

    let Some(existing) = catalog.active_price(&product.id).await? else {
        warn!(
            item = %item.display_name(),
            product_id = %product.id,
            "product has no active price"
        );
        return Ok((product.id, None, SyncOutcome::MissingPrice));
    };

    let wanted = to_minor_units(item.price);
    if existing.unit_amount == Some(wanted) {
        info!(item = %item.display_name(), "synced (existing)");
        return Ok((product.id, Some(existing.id), SyncOutcome::Unchanged));
    }

    info!(
        item = %item.display_name(),
        old = ?existing.unit_amount,
        new = wanted,
        "updating price"
    );
    // New price first: a failed create must leave the old one active.
    let price = catalog.create_price(&new_price_for(item, &product.id)).await?;
    catalog.deactivate_price(&existing.id).await?;
    Ok((product.id, Some(price.id), SyncOutcome::PriceUpdated))
}

/// Reconcile every item in order, pausing `delay` after each one. A failed
/// item is logged and skipped.
pub async fn sync_all(
    catalog: &dyn PaymentCatalog,
    items: &mut [InventoryItem],
    delay: Duration,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    info!(count = items.len(), "syncing products to payment catalog");

    for item in items.iter_mut() {
        match sync_item(catalog, item).await {
            Ok(SyncOutcome::Created) => report.created += 1,
            Ok(SyncOutcome::Unchanged) => report.unchanged += 1,
            Ok(SyncOutcome::PriceUpdated) => report.price_updated += 1,
            Ok(SyncOutcome::MissingPrice) => report.missing_price += 1,
            Err(err) => {
                error!(
                    listing_id = item.discogs_listing_id,
                    item = %item.display_name(),
                    %err,
                    "failed to sync item"
                );
                report.failed.push(item.discogs_listing_id);
            }
        }
        sleep(delay).await;
    }

    report
}
