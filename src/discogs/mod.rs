//! Client for the record marketplace (Discogs) API: paged seller inventory
//! and per-release metadata.
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{Request, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use crate::config::{Config, ConfigError};
use crate::error::{Result, SyncError};
use crate::http::RateLimitedClient;

pub mod model;

pub use model::{InventoryPage, Listing, Release};

const DISCOGS_API_BASE: &str = "https://api.discogs.com/";
const FOR_SALE: &str = "For Sale";

#[async_trait]
pub trait Marketplace: Send + Sync {
    /// Drain every "For Sale" listing of `seller`, in upstream order.
    async fn fetch_all_listings(&self, seller: &str) -> Result<Vec<Listing>>;

    /// Release metadata, or `None` when it cannot be fetched.
    async fn fetch_release(&self, release_id: u64) -> Option<Release>;
}

#[derive(Clone)]
pub struct DiscogsClient {
    http: RateLimitedClient,
    base_url: Url,
    token: String,
    user_agent: String,
    per_page: u32,
    page_delay: Duration,
}

impl fmt::Debug for DiscogsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscogsClient")
            .field("base_url", &self.base_url)
            .field("per_page", &self.per_page)
            .finish_non_exhaustive()
    }
}

impl DiscogsClient {
    pub fn new(http: RateLimitedClient, token: String, user_agent: String) -> Self {
        let base_url = Url::parse(DISCOGS_API_BASE).expect("valid default Discogs URL");
        Self::with_base_url(http, token, user_agent, base_url)
    }

    pub fn with_base_url(
        http: RateLimitedClient,
        token: String,
        user_agent: String,
        base_url: Url,
    ) -> Self {
        Self {
            http,
            base_url,
            token,
            user_agent,
            per_page: 100,
            page_delay: Duration::from_millis(1100),
        }
    }

    pub fn from_config(cfg: &Config, http: RateLimitedClient, token: &str) -> Result<Self> {
        let base_url = Url::parse(&cfg.discogs.base_url)
            .map_err(|_| ConfigError::Invalid("discogs.base_url must be a valid URL"))?;
        Ok(
            Self::with_base_url(http, token.to_string(), cfg.discogs.user_agent.clone(), base_url)
                .with_per_page(cfg.discogs.per_page)
                .with_page_delay(cfg.request_delay()),
        )
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, 100);
        self
    }

    /// Pause between successive inventory pages.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConfigError::Invalid("discogs.base_url cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(AUTHORIZATION, format!("Discogs token={}", self.token))
            .header(USER_AGENT, &self.user_agent)
    }

    pub fn build_inventory_request(&self, seller: &str, page: u32) -> Result<Request> {
        let url = self.endpoint(&["users", seller, "inventory"])?;
        let builder = self.http.http().get(url).query(&[
            ("status", FOR_SALE.to_string()),
            ("per_page", self.per_page.to_string()),
            ("page", page.to_string()),
        ]);
        Ok(self.authorized(builder).build()?)
    }

    pub fn build_release_request(&self, release_id: u64) -> Result<Request> {
        let url = self.endpoint(&["releases", &release_id.to_string()])?;
        Ok(self.authorized(self.http.http().get(url)).build()?)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SyncError::Upstream { status, body });
        }
        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip(self))]
    pub async fn fetch_inventory_page(&self, seller: &str, page: u32) -> Result<InventoryPage> {
        let request = self.build_inventory_request(seller, page)?;
        self.get_json(request).await
    }

    pub async fn fetch_all_listings(&self, seller: &str) -> Result<Vec<Listing>> {
        let mut listings = Vec::new();
        let mut page = 1;

        info!(seller, "fetching inventory");
        loop {
            let data = self.fetch_inventory_page(seller, page).await?;
            let found = data.listings.len();
            listings.extend(data.listings);
            info!(
                page,
                pages = data.pagination.pages,
                found,
                total = listings.len(),
                "fetched inventory page"
            );

            // Upstream's echoed page number is not trusted to advance.
            if page >= data.pagination.pages {
                break;
            }
            page += 1;
            sleep(self.page_delay).await;
        }

        Ok(listings)
    }

    /// Like [`Marketplace::fetch_release`] but surfaces the failure.
    #[instrument(skip(self))]
    pub async fn try_fetch_release(&self, release_id: u64) -> Result<Release> {
        let request = self.build_release_request(release_id)?;
        self.get_json(request)
            .await
            .map_err(|err| SyncError::Enrichment {
                release_id,
                reason: err.to_string(),
            })
    }

    pub async fn fetch_release(&self, release_id: u64) -> Option<Release> {
        match self.try_fetch_release(release_id).await {
            Ok(release) => Some(release),
            Err(err) => {
                warn!(release_id, %err, "could not fetch release; using listing data only");
                None
            }
        }
    }
}

#[async_trait]
impl Marketplace for DiscogsClient {
    async fn fetch_all_listings(&self, seller: &str) -> Result<Vec<Listing>> {
        DiscogsClient::fetch_all_listings(self, seller).await
    }

    async fn fetch_release(&self, release_id: u64) -> Option<Release> {
        DiscogsClient::fetch_release(self, release_id).await
    }
}
