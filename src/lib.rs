//! Storefront automation for a single-seller record shop.
//!
//! Mirrors the seller's marketplace inventory into a local JSON snapshot,
//! keeps a payment provider's product catalog in step with it, and carries
//! the checkout and webhook logic the storefront calls into.

pub mod checkout;
pub mod config;
pub mod discogs;
pub mod error;
pub mod http;
pub mod inventory;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod response;
pub mod sold;
pub mod storefront;
pub mod stripe;
pub mod transform;
pub mod webhook;

pub use error::{Result, SyncError};
pub use model::{Inventory, InventoryItem, ItemStatus, SoldRecord};
