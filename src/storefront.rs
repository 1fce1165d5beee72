//! Read-side helpers over the inventory snapshot for the storefront.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Inventory, InventoryItem, ItemStatus};

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// An available item with its URL slug.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    pub slug: String,
    pub item: &'a InventoryItem,
}

pub fn slug(artist: &str, title: &str, listing_id: u64) -> String {
    let raw = format!("{}-{}-{}", artist, title, listing_id).to_lowercase();
    NON_ALNUM.replace_all(&raw, "-").trim_matches('-').to_string()
}

/// Available items in snapshot order.
pub fn available(inventory: &Inventory) -> Vec<Record<'_>> {
    inventory
        .items
        .iter()
        .filter(|item| item.status == ItemStatus::Available)
        .map(|item| Record {
            slug: slug(&item.artist, &item.title, item.discogs_listing_id),
            item,
        })
        .collect()
}

pub fn by_slug<'a>(inventory: &'a Inventory, wanted: &str) -> Option<Record<'a>> {
    available(inventory).into_iter().find(|r| r.slug == wanted)
}

pub fn by_listing_id(inventory: &Inventory, listing_id: u64) -> Option<Record<'_>> {
    available(inventory)
        .into_iter()
        .find(|r| r.item.discogs_listing_id == listing_id)
}

pub fn featured(inventory: &Inventory, count: usize) -> Vec<Record<'_>> {
    available(inventory).into_iter().take(count).collect()
}

pub fn format_price(amount: f64, currency: &str) -> String {
    let code = currency.to_uppercase();
    match code.as_str() {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        "GBP" => format!("£{:.2}", amount),
        _ => format!("{:.2} {}", amount, code),
    }
}

/// Short label for a Discogs media/sleeve grade. Unknown grades pass through.
pub fn format_condition(condition: &str) -> &str {
    match condition {
        "Mint (M)" => "Mint",
        "Near Mint (NM or M-)" => "Near Mint",
        "Very Good Plus (VG+)" => "VG+",
        "Very Good (VG)" => "VG",
        "Good Plus (G+)" => "G+",
        "Good (G)" => "Good",
        "Fair (F)" => "Fair",
        "Poor (P)" => "Poor",
        other => other,
    }
}
