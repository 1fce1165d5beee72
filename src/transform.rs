//! Listing + optional release metadata → canonical [`InventoryItem`].
use crate::discogs::model::{ImageKind, Listing, Release};
use crate::model::{InventoryItem, ItemStatus};

const DISCOGS_WEB_BASE: &str = "https://www.discogs.com";
const MAX_SECONDARY_IMAGES: usize = 3;

/// Primary image first, then up to three secondary images in release order.
/// Falls back to the listing thumbnail when that yields nothing.
pub fn select_images(listing: &Listing, release: Option<&Release>) -> Vec<String> {
    let mut images = Vec::new();
    if let Some(release) = release {
        if let Some(primary) = release
            .images
            .iter()
            .find(|img| img.kind == ImageKind::Primary)
        {
            images.push(primary.uri.clone());
        }
        images.extend(
            release
                .images
                .iter()
                .filter(|img| img.kind == ImageKind::Secondary)
                .take(MAX_SECONDARY_IMAGES)
                .map(|img| img.uri.clone()),
        );
    }

    if images.is_empty() {
        if let Some(thumb) = non_empty(listing.release.thumbnail.as_deref()) {
            images.push(thumb.to_string());
        }
    }
    images
}

pub fn to_inventory_item(listing: &Listing, release: Option<&Release>) -> InventoryItem {
    let first_label = release.and_then(|r| r.labels.first());

    let catalog_number = first_label
        .and_then(|l| non_empty(l.catno.as_deref()))
        .or_else(|| non_empty(listing.release.catalog_number.as_deref()))
        .map(str::to_string);

    let year = release
        .and_then(|r| r.year)
        .filter(|y| *y > 0)
        .or(listing.release.year.filter(|y| *y > 0));

    let format = release
        .and_then(|r| r.formats.first())
        .and_then(|f| non_empty(Some(f.name.as_str())))
        .or_else(|| non_empty(listing.release.format.as_deref()))
        .map(str::to_string);

    InventoryItem {
        discogs_listing_id: listing.id,
        discogs_release_id: listing.release.id,
        stripe_product_id: None,
        stripe_price_id: None,
        title: listing.release.title.clone(),
        artist: listing.release.artist.clone(),
        label: first_label
            .and_then(|l| non_empty(Some(l.name.as_str())))
            .map(str::to_string),
        catalog_number,
        year,
        format,
        price: listing.price.value,
        currency: listing.price.currency.clone(),
        condition: listing.condition.clone(),
        sleeve_condition: listing.sleeve_condition.clone().unwrap_or_default(),
        comments: non_empty(listing.comments.as_deref()).map(str::to_string),
        discogs_url: canonical_url(&listing.uri),
        images: select_images(listing, release),
        status: ItemStatus::Available,
        listed_at: listing.posted.clone(),
        sold_at: None,
    }
}

/// The API returns either a site-relative path or an absolute URL.
fn canonical_url(uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        uri.to_string()
    } else if uri.starts_with('/') {
        format!("{}{}", DISCOGS_WEB_BASE, uri)
    } else {
        format!("{}/{}", DISCOGS_WEB_BASE, uri)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
