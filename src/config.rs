//! Configuration loader and validator for the record-shop sync pipeline.
//!
//! Non-secret settings live in YAML. Tokens and keys are read from the
//! environment only, see [`Secrets`].
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Missing required secret: {0}")]
    MissingSecret(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub discogs: Discogs,
    #[serde(default)]
    pub stripe: Stripe,
    #[serde(default)]
    pub checkout: Checkout,
    #[serde(default)]
    pub retry: Retry,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default = "default_inventory_path")]
    pub inventory_path: String,
    #[serde(default = "default_sold_db_path")]
    pub sold_db_path: String,
}

/// Marketplace (Discogs) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Discogs {
    pub seller: String,
    #[serde(default = "default_discogs_base_url")]
    pub base_url: String,
    pub user_agent: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

/// Payment provider (Stripe) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stripe {
    #[serde(default = "default_stripe_base_url")]
    pub base_url: String,
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
}

impl Default for Stripe {
    fn default() -> Self {
        Self {
            base_url: default_stripe_base_url(),
            item_delay_ms: default_item_delay_ms(),
        }
    }
}

/// Checkout session settings. Omitted fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Checkout {
    pub shipping_amount: i64,
    pub shipping_currency: String,
    pub shipping_display_name: String,
    pub allowed_countries: Vec<String>,
    pub delivery_min_days: u32,
    pub delivery_max_days: u32,
}

impl Default for Checkout {
    fn default() -> Self {
        Self {
            shipping_amount: 500,
            shipping_currency: "usd".into(),
            shipping_display_name: "Standard Shipping".into(),
            allowed_countries: vec!["US".into()],
            delivery_min_days: 3,
            delivery_max_days: 7,
        }
    }
}

/// Outbound retry policy shared by all upstream calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Retry {
    pub max_attempts: u32,
    pub transport_backoff_ms: u64,
    pub default_rate_limit_secs: u64,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transport_backoff_ms: 2000,
            default_rate_limit_secs: 60,
        }
    }
}

fn default_inventory_path() -> String {
    "data/inventory.json".into()
}

fn default_sold_db_path() -> String {
    "data/sold.db".into()
}

fn default_discogs_base_url() -> String {
    "https://api.discogs.com/".into()
}

fn default_stripe_base_url() -> String {
    "https://api.stripe.com/".into()
}

fn default_per_page() -> u32 {
    100
}

fn default_request_delay_ms() -> u64 {
    1100
}

fn default_item_delay_ms() -> u64 {
    100
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` and the
    /// inventory file's parent if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if !self.app.data_dir.trim().is_empty() {
            fs::create_dir_all(&self.app.data_dir)?;
        }
        if let Some(parent) = self.inventory_path().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    pub fn inventory_path(&self) -> PathBuf {
        PathBuf::from(&self.app.inventory_path)
    }

    pub fn sold_database_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.app.sold_db_path)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.discogs.request_delay_ms)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.stripe.item_delay_ms)
    }
}

/// Secrets provided by the environment. Treated as opaque strings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    pub discogs_token: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub deploy_hook_url: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("discogs_token", &self.discogs_token.is_some())
            .field("stripe_secret_key", &self.stripe_secret_key.is_some())
            .field("webhook_secret", &self.webhook_secret.is_some())
            .field("deploy_hook_url", &self.deploy_hook_url)
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup; blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            discogs_token: get("DISCOGS_TOKEN"),
            stripe_secret_key: get("STRIPE_SECRET_KEY"),
            webhook_secret: get("STRIPE_WEBHOOK_SECRET"),
            deploy_hook_url: get("DEPLOY_HOOK_URL"),
        }
    }

    pub fn require_discogs_token(&self) -> Result<&str, ConfigError> {
        self.discogs_token
            .as_deref()
            .ok_or(ConfigError::MissingSecret("DISCOGS_TOKEN"))
    }

    pub fn require_webhook_secret(&self) -> Result<&str, ConfigError> {
        self.webhook_secret
            .as_deref()
            .ok_or(ConfigError::MissingSecret("STRIPE_WEBHOOK_SECRET"))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    parse(&content)
}

/// Parse and validate a YAML document.
pub fn parse(content: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.inventory_path.trim().is_empty() {
        return Err(ConfigError::Invalid("app.inventory_path must be non-empty"));
    }

    if cfg.discogs.seller.trim().is_empty() {
        return Err(ConfigError::Invalid("discogs.seller must be non-empty"));
    }
    if cfg.discogs.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("discogs.user_agent must be non-empty"));
    }
    if cfg.discogs.per_page == 0 || cfg.discogs.per_page > 100 {
        return Err(ConfigError::Invalid("discogs.per_page must be within 1..=100"));
    }
    if reqwest::Url::parse(&cfg.discogs.base_url).is_err() {
        return Err(ConfigError::Invalid("discogs.base_url must be a valid URL"));
    }
    if reqwest::Url::parse(&cfg.stripe.base_url).is_err() {
        return Err(ConfigError::Invalid("stripe.base_url must be a valid URL"));
    }

    if cfg.checkout.shipping_amount < 0 {
        return Err(ConfigError::Invalid("checkout.shipping_amount must be >= 0"));
    }
    if cfg.checkout.allowed_countries.is_empty() {
        return Err(ConfigError::Invalid("checkout.allowed_countries must be non-empty"));
    }
    if cfg.checkout.delivery_min_days > cfg.checkout.delivery_max_days {
        return Err(ConfigError::Invalid(
            "checkout.delivery_min_days must not exceed delivery_max_days",
        ));
    }

    if cfg.retry.max_attempts == 0 {
        return Err(ConfigError::Invalid("retry.max_attempts must be > 0"));
    }

    Ok(())
}

/// Returns the example YAML shipped with the repository.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  inventory_path: "./data/inventory.json"
  sold_db_path: "./data/sold.db"

discogs:
  seller: "jeremyslindsey"
  base_url: "https://api.discogs.com/"
  user_agent: "RecordRefugeWebsite/1.0 +https://recordrefuge.com"
  per_page: 100
  request_delay_ms: 1100

stripe:
  base_url: "https://api.stripe.com/"
  item_delay_ms: 100

checkout:
  shipping_amount: 500
  shipping_currency: "usd"
  shipping_display_name: "Standard Shipping"
  allowed_countries:
    - US
  delivery_min_days: 3
  delivery_max_days: 7

retry:
  max_attempts: 3
  transport_backoff_ms: 2000
  default_rate_limit_secs: 60
"#
}
