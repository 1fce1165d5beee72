mod common;

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use common::{listing, RecordingCatalog, StaticMarketplace};
use record_shop_sync::discogs::model::{Format, Image, ImageKind, Label};
use record_shop_sync::discogs::Release;
use record_shop_sync::pipeline::{run_sync, SyncSettings};
use record_shop_sync::stripe::PaymentCatalog;
use record_shop_sync::transform::to_inventory_item;
use record_shop_sync::{inventory, Inventory, SyncError};
use reqwest::StatusCode;
use tempfile::tempdir;

fn settings(path: &Path) -> SyncSettings {
    SyncSettings {
        seller: "shop".into(),
        inventory_path: path.to_path_buf(),
        request_delay: Duration::ZERO,
        item_delay: Duration::ZERO,
    }
}

fn release(id: u64) -> Release {
    Release {
        id,
        title: "Title".into(),
        artists: vec![],
        labels: vec![Label {
            name: "Warner".into(),
            catno: Some("MS 2038".into()),
        }],
        year: Some(1971),
        formats: vec![Format {
            name: "Vinyl".into(),
            descriptions: vec!["LP".into()],
        }],
        images: vec![
            Image {
                uri: "https://img/s1.jpg".into(),
                kind: ImageKind::Secondary,
            },
            Image {
                uri: "https://img/p.jpg".into(),
                kind: ImageKind::Primary,
            },
        ],
    }
}

async fn write_prior(path: &Path) {
    let mut prior_item = to_inventory_item(&listing(2, 15.0), None);
    prior_item.stripe_product_id = Some("prod_X".into());
    prior_item.stripe_price_id = Some("price_X".into());
    let prior = Inventory {
        last_sync: Utc::now(),
        seller: "shop".into(),
        items: vec![prior_item],
    };
    inventory::save(path, &prior).await.unwrap();
}

#[tokio::test]
async fn full_run_enriches_reconciles_and_merges() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    write_prior(&path).await;

    let mut marketplace = StaticMarketplace::new(vec![listing(1, 19.99), listing(2, 15.0)]);
    marketplace.releases.insert(10, release(10));
    let catalog = RecordingCatalog::default();
    // Listing 2 fails this run, so its ids must come from the prior snapshot.
    catalog.fail_listing(2).await;

    let summary = run_sync(
        &marketplace,
        Some(&catalog as &dyn PaymentCatalog),
        &settings(&path),
    )
    .await
    .unwrap();

    assert_eq!(summary.listings, 2);
    assert_eq!(summary.enriched, 1);
    assert_eq!(marketplace.release_calls().await, vec![10, 20]);
    let report = summary.reconcile.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.failed, vec![2]);

    let saved = inventory::load(&path).await.unwrap();
    assert_eq!(saved.seller, "shop");
    assert_eq!(saved.items.len(), 2);

    let first = &saved.items[0];
    assert_eq!(first.discogs_listing_id, 1);
    assert_eq!(first.label.as_deref(), Some("Warner"));
    assert_eq!(first.catalog_number.as_deref(), Some("MS 2038"));
    assert_eq!(first.year, Some(1971));
    assert_eq!(first.format.as_deref(), Some("Vinyl"));
    assert_eq!(first.images, vec!["https://img/p.jpg", "https://img/s1.jpg"]);
    assert!(first.stripe_product_id.is_some());

    let second = &saved.items[1];
    assert_eq!(second.images, vec!["https://img/2/thumb.jpg"]);
    assert_eq!(second.catalog_number.as_deref(), Some("CAT-2"));
    assert_eq!(second.stripe_product_id.as_deref(), Some("prod_X"));
    assert_eq!(second.stripe_price_id.as_deref(), Some("price_X"));
    assert_eq!(second.discogs_url, "https://www.discogs.com/sell/item/2");
}

#[tokio::test]
async fn run_without_catalog_carries_prior_ids() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    write_prior(&path).await;

    let marketplace = StaticMarketplace::new(vec![listing(2, 15.0), listing(3, 8.0)]);
    let summary = run_sync(&marketplace, None, &settings(&path)).await.unwrap();

    assert!(summary.reconcile.is_none());
    let saved = summary.inventory.unwrap();
    assert_eq!(saved.items[0].stripe_product_id.as_deref(), Some("prod_X"));
    assert!(saved.items[1].stripe_product_id.is_none());
    assert_eq!(inventory::load(&path).await.unwrap(), saved);
}

#[tokio::test]
async fn sold_listings_drop_out_of_the_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    write_prior(&path).await;

    let marketplace = StaticMarketplace::new(vec![listing(3, 8.0)]);
    run_sync(&marketplace, None, &settings(&path)).await.unwrap();

    let saved = inventory::load(&path).await.unwrap();
    let ids: Vec<u64> = saved.items.iter().map(|i| i.discogs_listing_id).collect();
    assert_eq!(ids, vec![3]);
}

#[tokio::test]
async fn empty_upstream_leaves_snapshot_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    write_prior(&path).await;
    let before = std::fs::read_to_string(&path).unwrap();

    let marketplace = StaticMarketplace::new(vec![]);
    let catalog = RecordingCatalog::default();
    let summary = run_sync(
        &marketplace,
        Some(&catalog as &dyn PaymentCatalog),
        &settings(&path),
    )
    .await
    .unwrap();

    assert_eq!(summary.listings, 0);
    assert!(summary.inventory.is_none());
    assert!(catalog.calls().await.is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn empty_upstream_without_snapshot_writes_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inventory.json");

    let marketplace = StaticMarketplace::new(vec![]);
    run_sync(&marketplace, None, &settings(&path)).await.unwrap();

    assert!(!path.exists());
}

#[tokio::test]
async fn failed_listing_fetch_leaves_snapshot_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    write_prior(&path).await;
    let before = std::fs::read(&path).unwrap();

    let mut marketplace = StaticMarketplace::new(vec![listing(1, 5.0)]);
    marketplace.fail_with = Some(StatusCode::BAD_GATEWAY);
    let catalog = RecordingCatalog::default();
    let err = run_sync(
        &marketplace,
        Some(&catalog as &dyn PaymentCatalog),
        &settings(&path),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SyncError::Upstream { .. }));
    assert!(err.is_fatal());
    assert!(catalog.calls().await.is_empty());
    assert!(marketplace.release_calls().await.is_empty());
    assert_eq!(std::fs::read(&path).unwrap(), before);
}
