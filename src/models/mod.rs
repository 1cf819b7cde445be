use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The only province this deployment serves. Every item query is pinned to it.
pub const PROVINCE: &str = "Davao del Sur";

/// Plain latitude/longitude pair used by the view models
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Category of a rentable item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Electronics,
    Tools,
    Furniture,
    Vehicles,
    Sports,
    PartyEquipment,
    Gardening,
    Construction,
    Other,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 9] = [
        ItemCategory::Electronics,
        ItemCategory::Tools,
        ItemCategory::Furniture,
        ItemCategory::Vehicles,
        ItemCategory::Sports,
        ItemCategory::PartyEquipment,
        ItemCategory::Gardening,
        ItemCategory::Construction,
        ItemCategory::Other,
    ];

    /// Value stored in the `category` field of item documents
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Electronics => "electronics",
            ItemCategory::Tools => "tools",
            ItemCategory::Furniture => "furniture",
            ItemCategory::Vehicles => "vehicles",
            ItemCategory::Sports => "sports",
            ItemCategory::PartyEquipment => "party_equipment",
            ItemCategory::Gardening => "gardening",
            ItemCategory::Construction => "construction",
            ItemCategory::Other => "other",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown item category: {s}"))
    }
}

/// How the listed price is charged
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    PerDay,
    PerWeek,
    PerMonth,
    Fixed,
}

impl PriceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceType::PerDay => "per_day",
            PriceType::PerWeek => "per_week",
            PriceType::PerMonth => "per_month",
            PriceType::Fixed => "fixed",
        }
    }
}

/// Item view model, reassembled from a stored document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: ItemCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub price: f64,
    pub price_type: PriceType,
    #[serde(default)]
    pub images: Vec<String>,
    pub location: GeoPoint,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub lessor_id: String,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifications: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit: Option<f64>,
    /// In days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_rental_period: Option<u32>,
    /// In days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_rental_period: Option<u32>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub view_count: u64,
    /// Distance from the search origin. Never stored, only attached by a search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Fields supplied by a lessor when listing a new item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub category: ItemCategory,
    pub subcategory: Option<String>,
    pub price: f64,
    pub price_type: PriceType,
    /// Already-hosted image URLs
    pub images: Vec<String>,
    pub location: GeoPoint,
    pub address: String,
    pub city: String,
    pub tags: Vec<String>,
    pub specifications: Option<serde_json::Map<String, serde_json::Value>>,
    pub deposit: Option<f64>,
    pub minimum_rental_period: Option<u32>,
    pub maximum_rental_period: Option<u32>,
}

/// Partial edit of an item. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<ItemCategory>,
    pub subcategory: Option<String>,
    pub price: Option<f64>,
    pub price_type: Option<PriceType>,
    pub images: Option<Vec<String>>,
    pub location: Option<GeoPoint>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_available: Option<bool>,
    pub deposit: Option<f64>,
}

/// Inclusive price bounds. Both ends are required when a range is given.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Result ordering requested by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    PriceLowToHigh,
    PriceHighToLow,
    Rating,
    Distance,
    Newest,
    Oldest,
    Popularity,
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_low_to_high" => Ok(SortOption::PriceLowToHigh),
            "price_high_to_low" => Ok(SortOption::PriceHighToLow),
            "rating" => Ok(SortOption::Rating),
            "distance" => Ok(SortOption::Distance),
            "newest" => Ok(SortOption::Newest),
            "oldest" => Ok(SortOption::Oldest),
            "popularity" => Ok(SortOption::Popularity),
            other => Err(format!("unknown sort option: {other}")),
        }
    }
}

/// Search filters for item browsing. Every field is optional; absence means
/// no constraint on that dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub category: Option<ItemCategory>,
    pub subcategory: Option<String>,
    pub availability: Option<bool>,
    pub price_range: Option<PriceRange>,
    /// Fallback origin when the caller does not pass one explicitly
    pub location: Option<GeoPoint>,
    /// Radius in kilometers around the origin
    pub radius: Option<f64>,
    pub sort_by: Option<SortOption>,
}

/// One page of search output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub items: Vec<Item>,
    /// Number of items on this page after radius filtering, not a collection-wide count
    pub total: usize,
    /// Resume point for [`crate::search::ItemQueryService::search_after`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<crate::store::Cursor>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Renter,
    Lessor,
    Admin,
}

/// Signed-in marketplace user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub province: String,
}
