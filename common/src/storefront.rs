use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::location::GeoLocation;
use crate::review::StoreRating;
use crate::subscription::SubscriptionStatus;

/// Unique store identifier. One store per seller account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreId(pub String);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A seller's storefront.
///
/// `store_active` is the seller's own online/offline toggle and is
/// independent of `subscription_status`; see
/// [`crate::subscription::is_externally_visible`] for how the two combine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub owner: UserId,
    pub name: String,
    #[serde(default)]
    pub address: String,
    /// Listings inherit this location for distance ranking.
    pub location: GeoLocation,
    pub subscription_status: SubscriptionStatus,
    pub store_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub fssai_license: Option<String>,
    #[serde(default)]
    pub fssai_submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fssai_verified: bool,
    #[serde(default)]
    pub rating: StoreRating,
}

impl Store {
    /// Shortcut for [`crate::subscription::is_externally_visible`].
    pub fn is_externally_visible(&self) -> bool {
        crate::subscription::is_externally_visible(self)
    }

    pub fn set_online(&mut self, online: bool) {
        self.store_active = online;
    }

    pub fn apply_rating(&mut self, rating: StoreRating) {
        self.rating = rating;
    }
}
