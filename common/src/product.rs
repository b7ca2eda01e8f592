use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::identity::UserId;
use crate::storefront::StoreId;

/// Unique listing identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category of a home-seller listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingCategory {
    FreshFood,
    Pickles,
    Vegetables,
    ArtHandmade,
    PartyPackage,
}

impl fmt::Display for ListingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListingCategory::FreshFood => "fresh_food",
            ListingCategory::Pickles => "pickles",
            ListingCategory::Vegetables => "vegetables",
            ListingCategory::ArtHandmade => "art_handmade",
            ListingCategory::PartyPackage => "party_package",
        };
        f.write_str(name)
    }
}

/// How an order reaches the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Pickup,
    Delivery,
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMethod::Pickup => f.write_str("pickup"),
            DeliveryMethod::Delivery => f.write_str("delivery"),
        }
    }
}

/// How a listing is priced. Prices are in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingPricing {
    PerUnit {
        unit_price: u64,
        min_quantity: u32,
        #[serde(default)]
        max_quantity: Option<u32>,
    },
    /// Headcount -> package price. Only for party listings.
    PartyPackages(BTreeMap<u32, u64>),
}

/// A product or service offered by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner: UserId,
    pub store_id: StoreId,
    pub title: String,
    pub description: String,
    pub category: ListingCategory,
    pub pricing: ListingPricing,
    #[serde(default = "default_true")]
    pub is_veg: bool,
    pub delivery_available: bool,
    pub pickup_available: bool,
    /// Days the listing can be scheduled for. Empty means every day.
    #[serde(default)]
    pub availability_days: Vec<Weekday>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Listing {
    pub fn offers(&self, method: DeliveryMethod) -> bool {
        match method {
            DeliveryMethod::Pickup => self.pickup_available,
            DeliveryMethod::Delivery => self.delivery_available,
        }
    }

    /// At least one way to get the order to the buyer is switched on.
    pub fn has_fulfilment(&self) -> bool {
        self.pickup_available || self.delivery_available
    }

    pub fn is_available_on(&self, day: Weekday) -> bool {
        self.availability_days.is_empty() || self.availability_days.contains(&day)
    }

    /// Lowercased title and description, the text buyers search against.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }

    /// Every whitespace-separated token of `query` must occur in the listing
    /// text, ignoring case. A blank query matches everything.
    pub fn matches_search(&self, query: &str) -> bool {
        let haystack = self.searchable_text();
        query
            .to_lowercase()
            .split_whitespace()
            .all(|token| haystack.contains(token))
    }

    /// Check the listing's internal consistency before it is offered.
    pub fn validate(&self) -> Result<()> {
        match (&self.pricing, self.category) {
            (ListingPricing::PartyPackages(packages), ListingCategory::PartyPackage) => {
                if packages.is_empty() {
                    return Err(EngineError::InvalidListing(
                        "party listing needs at least one package",
                    ));
                }
                if packages.contains_key(&0) {
                    return Err(EngineError::InvalidListing(
                        "party package headcount must be positive",
                    ));
                }
            }
            (ListingPricing::PartyPackages(_), _) => {
                return Err(EngineError::InvalidListing(
                    "only party listings can have party packages",
                ));
            }
            (ListingPricing::PerUnit { .. }, ListingCategory::PartyPackage) => {
                return Err(EngineError::InvalidListing(
                    "party listings must be priced by package",
                ));
            }
            (
                ListingPricing::PerUnit {
                    min_quantity,
                    max_quantity,
                    ..
                },
                _,
            ) => {
                if *min_quantity == 0 {
                    return Err(EngineError::InvalidListing("minimum quantity must be at least 1"));
                }
                if max_quantity.is_some_and(|max| max < *min_quantity) {
                    return Err(EngineError::InvalidListing(
                        "maximum quantity is below the minimum",
                    ));
                }
            }
        }

        if self.active && !self.has_fulfilment() {
            return Err(EngineError::InvalidListing(
                "an active listing must offer delivery or pickup",
            ));
        }
        Ok(())
    }
}
