use serde::{Deserialize, Serialize};

/// One page of `GET /users/{seller}/inventory`.
#[derive(Deserialize, Debug)]
pub struct InventoryPage {
    #[serde(default)]
    pub listings: Vec<Listing>,
    pub pagination: Pagination,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub pages: u32,
    #[serde(default)]
    pub items: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: u64,
    pub status: String,
    pub price: ListingPrice,
    pub condition: String,
    #[serde(default)]
    pub sleeve_condition: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub posted: String,
    pub release: ListingRelease,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ListingPrice {
    pub value: f64,
    pub currency: String,
}

/// Release summary embedded in every listing.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ListingRelease {
    pub id: u64,
    #[serde(default)]
    pub description: Option<String>,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub catalog_number: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// `GET /releases/{id}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Release {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub formats: Vec<Format>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Artist {
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub catno: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Format {
    pub name: String,
    #[serde(default)]
    pub descriptions: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Image {
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: ImageKind,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Primary,
    Secondary,
    #[serde(other)]
    Other,
}
