use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// List envelope shared by search and list endpoints.
#[derive(Deserialize, Debug)]
pub struct List<T> {
    pub data: Vec<T>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Price {
    pub id: String,
    pub product: String,
    /// Minor currency units (cents).
    #[serde(default)]
    pub unit_amount: Option<i64>,
    pub currency: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub metadata: BTreeMap<String, String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrice {
    pub product: String,
    pub unit_amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingRate {
    pub amount: i64,
    pub currency: String,
    pub display_name: String,
    pub min_business_days: u32,
    pub max_business_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckoutSession {
    pub price_id: String,
    pub quantity: u32,
    pub allowed_countries: Vec<String>,
    pub shipping: ShippingRate,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}
