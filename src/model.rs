use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Available,
    Sold,
    Reserved,
}

/// One record for sale, as persisted in the inventory snapshot.
///
/// `discogs_listing_id` is the identity across runs. Provider ids are
/// assigned by the payment platform and carried forward on merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub discogs_listing_id: u64,
    pub discogs_release_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_price_id: Option<String>,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub price: f64,
    pub currency: String,
    pub condition: String,
    #[serde(default)]
    pub sleeve_condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub discogs_url: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub listed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    /// "Artist - Title", used for provider product names and log lines.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Persisted inventory snapshot, read by the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Inventory {
    #[serde(rename = "lastSync")]
    pub last_sync: DateTime<Utc>,
    pub seller: String,
    pub items: Vec<InventoryItem>,
}

/// Written by the webhook when a checkout completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SoldRecord {
    pub listing_id: u64,
    pub sold_at: DateTime<Utc>,
    pub session_id: String,
    pub customer_email: Option<String>,
    pub amount_total: Option<i64>,
}
