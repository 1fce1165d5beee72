#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use record_shop_sync::discogs::model::{ListingPrice, ListingRelease};
use record_shop_sync::discogs::{Listing, Marketplace, Release};
use record_shop_sync::stripe::{NewPrice, NewProduct, PaymentCatalog, Price, Product, LISTING_ID_KEY};
use record_shop_sync::{Result, SyncError};
use reqwest::StatusCode;
use tokio::sync::Mutex;

#[derive(Default)]
struct CatalogState {
    products: Vec<Product>,
    prices: Vec<Price>,
    calls: Vec<String>,
    next_id: u32,
}

/// In-memory payment catalog that records every call.
#[derive(Clone, Default)]
pub struct RecordingCatalog {
    state: Arc<Mutex<CatalogState>>,
    failing: Arc<Mutex<HashSet<u64>>>,
    price_create_failures: Arc<Mutex<u32>>,
}

impl RecordingCatalog {
    /// Searches for `listing_id` fail with a provider error.
    pub async fn fail_listing(&self, listing_id: u64) {
        self.failing.lock().await.insert(listing_id);
    }

    /// The next `times` price creations fail with a provider error.
    pub async fn fail_price_creates(&self, times: u32) {
        *self.price_create_failures.lock().await = times;
    }

    pub async fn seed_product(&self, product_id: &str, listing_id: u64) {
        let mut metadata = HashMap::new();
        metadata.insert(LISTING_ID_KEY.to_string(), listing_id.to_string());
        self.state.lock().await.products.push(Product {
            id: product_id.to_string(),
            name: format!("seeded {listing_id}"),
            active: true,
            metadata,
        });
    }

    pub async fn seed_price(&self, price_id: &str, product_id: &str, unit_amount: i64) {
        self.state.lock().await.prices.push(Price {
            id: price_id.to_string(),
            product: product_id.to_string(),
            unit_amount: Some(unit_amount),
            currency: "usd".into(),
            active: true,
        });
    }

    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    pub async fn count(&self, prefix: &str) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub async fn prices(&self) -> Vec<Price> {
        self.state.lock().await.prices.clone()
    }

    pub async fn products(&self) -> Vec<Product> {
        self.state.lock().await.products.clone()
    }
}

#[async_trait]
impl PaymentCatalog for RecordingCatalog {
    async fn find_product_by_listing(&self, listing_id: u64) -> Result<Option<Product>> {
        let mut state = self.state.lock().await;
        state.calls.push(format!("search {listing_id}"));
        if self.failing.lock().await.contains(&listing_id) {
            return Err(SyncError::Upstream {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom".into(),
            });
        }
        let wanted = listing_id.to_string();
        Ok(state
            .products
            .iter()
            .find(|p| p.metadata.get(LISTING_ID_KEY) == Some(&wanted))
            .cloned())
    }

    async fn active_price(&self, product_id: &str) -> Result<Option<Price>> {
        let mut state = self.state.lock().await;
        state.calls.push(format!("active_price {product_id}"));
        Ok(state
            .prices
            .iter()
            .find(|p| p.product == product_id && p.active)
            .cloned())
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let created = Product {
            id: format!("prod_{}", state.next_id),
            name: product.name.clone(),
            active: true,
            metadata: product.metadata.clone().into_iter().collect(),
        };
        state.calls.push(format!("create_product {}", created.id));
        state.products.push(created.clone());
        Ok(created)
    }

    async fn create_price(&self, price: &NewPrice) -> Result<Price> {
        let mut state = self.state.lock().await;
        let mut failures = self.price_create_failures.lock().await;
        if *failures > 0 {
            *failures -= 1;
            state.calls.push(format!("create_price failed {}", price.unit_amount));
            return Err(SyncError::Upstream {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "try again".into(),
            });
        }
        state.next_id += 1;
        let created = Price {
            id: format!("price_{}", state.next_id),
            product: price.product.clone(),
            unit_amount: Some(price.unit_amount),
            currency: price.currency.clone(),
            active: true,
        };
        state
            .calls
            .push(format!("create_price {} {}", created.id, price.unit_amount));
        state.prices.push(created.clone());
        Ok(created)
    }

    async fn deactivate_price(&self, price_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(format!("deactivate_price {price_id}"));
        if let Some(price) = state.prices.iter_mut().find(|p| p.id == price_id) {
            price.active = false;
        }
        Ok(())
    }
}

/// Marketplace serving canned listings; releases are returned only for ids
/// that were registered.
#[derive(Clone, Default)]
pub struct StaticMarketplace {
    pub listings: Vec<Listing>,
    pub releases: HashMap<u64, Release>,
    /// When set, listing fetches fail with this upstream status.
    pub fail_with: Option<StatusCode>,
    release_calls: Arc<Mutex<Vec<u64>>>,
}

impl StaticMarketplace {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            ..Default::default()
        }
    }

    pub async fn release_calls(&self) -> Vec<u64> {
        self.release_calls.lock().await.clone()
    }
}

#[async_trait]
impl Marketplace for StaticMarketplace {
    async fn fetch_all_listings(&self, _seller: &str) -> Result<Vec<Listing>> {
        if let Some(status) = self.fail_with {
            return Err(SyncError::Upstream {
                status,
                body: "upstream unavailable".into(),
            });
        }
        Ok(self.listings.clone())
    }

    async fn fetch_release(&self, release_id: u64) -> Option<Release> {
        self.release_calls.lock().await.push(release_id);
        self.releases.get(&release_id).cloned()
    }
}

pub fn listing(id: u64, price: f64) -> Listing {
    Listing {
        id,
        status: "For Sale".into(),
        price: ListingPrice {
            value: price,
            currency: "USD".into(),
        },
        condition: "Very Good Plus (VG+)".into(),
        sleeve_condition: Some("Very Good (VG)".into()),
        comments: None,
        uri: format!("/sell/item/{id}"),
        posted: "2024-04-01T10:00:00-07:00".into(),
        release: ListingRelease {
            id: id * 10,
            description: None,
            title: format!("Title {id}"),
            artist: "Artist".into(),
            format: Some("LP".into()),
            catalog_number: Some(format!("CAT-{id}")),
            year: Some(1979),
            thumbnail: Some(format!("https://img/{id}/thumb.jpg")),
        },
    }
}
