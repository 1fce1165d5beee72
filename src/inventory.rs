//! Inventory snapshot persistence and cross-run merge of provider ids.
use chrono::Utc;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::model::{Inventory, InventoryItem};

/// Read the previous snapshot. A missing file is `None`; an unreadable or
/// corrupt one is logged and also treated as `None`.
pub async fn load(path: &Path) -> Option<Inventory> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), %err, "could not read existing inventory");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(inventory) => Some(inventory),
        Err(err) => {
            warn!(path = %path.display(), %err, "could not parse existing inventory");
            None
        }
    }
}

fn is_blank(id: &Option<String>) -> bool {
    id.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Copy provider ids from `prior` into items that lack them. Ids already
/// present on a new item are never replaced.
pub fn merge_provider_ids(items: &mut [InventoryItem], prior: Option<&Inventory>) {
    let Some(prior) = prior else {
        return;
    };
    let by_listing: HashMap<u64, &InventoryItem> = prior
        .items
        .iter()
        .map(|item| (item.discogs_listing_id, item))
        .collect();

    for item in items.iter_mut() {
        let Some(existing) = by_listing.get(&item.discogs_listing_id) else {
            continue;
        };
        if is_blank(&item.stripe_product_id) && !is_blank(&existing.stripe_product_id) {
            item.stripe_product_id = existing.stripe_product_id.clone();
        }
        if is_blank(&item.stripe_price_id) && !is_blank(&existing.stripe_price_id) {
            item.stripe_price_id = existing.stripe_price_id.clone();
        }
    }
}

/// Atomically replace the snapshot at `path`: write a sibling temp file,
/// fsync it, then rename over the target.
#[instrument(skip(inventory), fields(items = inventory.items.len()))]
pub async fn save(path: &Path, inventory: &Inventory) -> Result<()> {
    let json = serde_json::to_vec_pretty(inventory)?;
    let target: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&target, &json))
        .await
        .map_err(|err| SyncError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))??;
    info!(path = %path.display(), "inventory saved");
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Merge `items` with `prior` and persist a fresh snapshot for `seller`.
pub async fn merge_and_save(
    mut items: Vec<InventoryItem>,
    prior: Option<&Inventory>,
    seller: &str,
    path: &Path,
) -> Result<Inventory> {
    merge_provider_ids(&mut items, prior);
    let inventory = Inventory {
        last_sync: Utc::now(),
        seller: seller.to_string(),
        items,
    };
    save(path, &inventory).await?;
    Ok(inventory)
}
