//! Payment provider (Stripe) client: the product/price calls used by the
//! reconciler and the checkout-session call used by the storefront.
use async_trait::async_trait;
use reqwest::{Method, Request, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::{Config, ConfigError};
use crate::error::{Result, SyncError};
use crate::http::RateLimitedClient;

pub mod model;

pub use model::{
    CheckoutSession, NewCheckoutSession, NewPrice, NewProduct, Price, Product, ShippingRate,
};
use model::List;

const STRIPE_API_BASE: &str = "https://api.stripe.com/";
pub const LISTING_ID_KEY: &str = "discogs_listing_id";

type Form = Vec<(String, String)>;

/// Remote product/price catalog used by reconciliation.
#[async_trait]
pub trait PaymentCatalog: Send + Sync {
    /// Product tagged with `listing_id` in its metadata, if any.
    async fn find_product_by_listing(&self, listing_id: u64) -> Result<Option<Product>>;

    /// The product's single active price, if any.
    async fn active_price(&self, product_id: &str) -> Result<Option<Price>>;

    async fn create_product(&self, product: &NewProduct) -> Result<Product>;

    async fn create_price(&self, price: &NewPrice) -> Result<Price>;

    async fn deactivate_price(&self, price_id: &str) -> Result<()>;
}

#[async_trait]
pub trait CheckoutSessions: Send + Sync {
    async fn create_checkout_session(&self, session: &NewCheckoutSession)
        -> Result<CheckoutSession>;
}

#[derive(Clone)]
pub struct StripeClient {
    http: RateLimitedClient,
    base_url: Url,
    secret_key: String,
}

impl fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    pub fn new(http: RateLimitedClient, secret_key: String) -> Self {
        let base_url = Url::parse(STRIPE_API_BASE).expect("valid default Stripe URL");
        Self::with_base_url(http, secret_key, base_url)
    }

    pub fn with_base_url(http: RateLimitedClient, secret_key: String, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            secret_key,
        }
    }

    pub fn from_config(cfg: &Config, http: RateLimitedClient, secret_key: &str) -> Result<Self> {
        let base_url = Url::parse(&cfg.stripe.base_url)
            .map_err(|_| ConfigError::Invalid("stripe.base_url must be a valid URL"))?;
        Ok(Self::with_base_url(http, secret_key.to_string(), base_url))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConfigError::Invalid("stripe.base_url cannot be a base URL"))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    pub fn build_get(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Request> {
        let url = self.endpoint(segments)?;
        Ok(self
            .http
            .http()
            .request(Method::GET, url)
            .bearer_auth(&self.secret_key)
            .query(query)
            .build()?)
    }

    /// Form-encoded POST. Each call gets a fresh idempotency key; the HTTP
    /// client's transport retries replay the same key.
    pub fn build_post(&self, segments: &[&str], form: &Form) -> Result<Request> {
        let url = self.endpoint(segments)?;
        Ok(self
            .http
            .http()
            .request(Method::POST, url)
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(form)
            .build()?)
    }

    async fn send<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        debug!(method = %request.method(), url = %request.url(), "sending stripe request");
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
    pub async fn find_product_by_listing(&self, listing_id: u64) -> Result<Option<Product>> {
        let request = self.build_get(
            &["products", "search"],
            &[("query", listing_search_query(listing_id))],
        )?;
        let found: List<Product> = self.send(request).await?;
        Ok(found.data.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn active_price(&self, product_id: &str) -> Result<Option<Price>> {
        let request = self.build_get(
            &["prices"],
            &[
                ("product", product_id.to_string()),
                ("active", "true".to_string()),
                ("limit", "1".to_string()),
            ],
        )?;
        let found: List<Price> = self.send(request).await?;
        Ok(found.data.into_iter().next())
    }

    #[instrument(skip_all, fields(name = %product.name))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product> {
        let request = self.build_post(&["products"], &product_form(product))?;
        self.send(request).await
    }

    #[instrument(skip_all, fields(product = %price.product, unit_amount = price.unit_amount))]
    pub async fn create_price(&self, price: &NewPrice) -> Result<Price> {
        let request = self.build_post(&["prices"], &price_form(price))?;
        self.send(request).await
    }

    #[instrument(skip(self))]
    pub async fn deactivate_price(&self, price_id: &str) -> Result<()> {
        let form = vec![("active".to_string(), "false".to_string())];
        let request = self.build_post(&["prices", price_id], &form)?;
        let _updated: Price = self.send(request).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(price_id = %session.price_id))]
    pub async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSession> {
        let request = self.build_post(&["checkout", "sessions"], &checkout_session_form(session))?;
        self.send(request).await
    }
}

#[async_trait]
impl PaymentCatalog for StripeClient {
    async fn find_product_by_listing(&self, listing_id: u64) -> Result<Option<Product>> {
        StripeClient::find_product_by_listing(self, listing_id).await
    }

    async fn active_price(&self, product_id: &str) -> Result<Option<Price>> {
        StripeClient::active_price(self, product_id).await
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product> {
        StripeClient::create_product(self, product).await
    }

    async fn create_price(&self, price: &NewPrice) -> Result<Price> {
        StripeClient::create_price(self, price).await
    }

    async fn deactivate_price(&self, price_id: &str) -> Result<()> {
        StripeClient::deactivate_price(self, price_id).await
    }
}

#[async_trait]
impl CheckoutSessions for StripeClient {
    async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSession> {
        StripeClient::create_checkout_session(self, session).await
    }
}

/// Search-query predicate matching products tagged with a listing id.
pub fn listing_search_query(listing_id: u64) -> String {
    format!("metadata['{}']:'{}'", LISTING_ID_KEY, listing_id)
}

pub fn product_form(product: &NewProduct) -> Form {
    let mut form = vec![
        ("name".to_string(), product.name.clone()),
        ("description".to_string(), product.description.clone()),
    ];
    for (key, value) in &product.metadata {
        form.push((format!("metadata[{}]", key), value.clone()));
    }
    for (i, image) in product.images.iter().enumerate() {
        form.push((format!("images[{}]", i), image.clone()));
    }
    form
}

pub fn price_form(price: &NewPrice) -> Form {
    vec![
        ("product".to_string(), price.product.clone()),
        ("unit_amount".to_string(), price.unit_amount.to_string()),
        ("currency".to_string(), price.currency.to_lowercase()),
    ]
}

pub fn checkout_session_form(session: &NewCheckoutSession) -> Form {
    let rate = "shipping_options[0][shipping_rate_data]";
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("line_items[0][price]".to_string(), session.price_id.clone()),
        (
            "line_items[0][quantity]".to_string(),
            session.quantity.to_string(),
        ),
    ];
    for (i, country) in session.allowed_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{}]", i),
            country.clone(),
        ));
    }
    form.extend([
        (format!("{rate}[type]"), "fixed_amount".to_string()),
        (
            format!("{rate}[fixed_amount][amount]"),
            session.shipping.amount.to_string(),
        ),
        (
            format!("{rate}[fixed_amount][currency]"),
            session.shipping.currency.to_lowercase(),
        ),
        (
            format!("{rate}[display_name]"),
            session.shipping.display_name.clone(),
        ),
        (
            format!("{rate}[delivery_estimate][minimum][unit]"),
            "business_day".to_string(),
        ),
        (
            format!("{rate}[delivery_estimate][minimum][value]"),
            session.shipping.min_business_days.to_string(),
        ),
        (
            format!("{rate}[delivery_estimate][maximum][unit]"),
            "business_day".to_string(),
        ),
        (
            format!("{rate}[delivery_estimate][maximum][value]"),
            session.shipping.max_business_days.to_string(),
        ),
        ("success_url".to_string(), session.success_url.clone()),
        ("cancel_url".to_string(), session.cancel_url.clone()),
    ]);
    for (key, value) in &session.metadata {
        form.push((format!("metadata[{}]", key), value.clone()));
    }
    form
}
