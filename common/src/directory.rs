//! Buyer-facing listing feed: which listings a buyer may see, and in what order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::config::MarketplaceConfig;
use crate::identity::UserId;
use crate::location::GeoLocation;
use crate::product::{Listing, ListingCategory};
use crate::storefront::{Store, StoreId};

/// Filters a buyer applies to the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedCriteria {
    /// Empty means every category.
    #[serde(default)]
    pub categories: Vec<ListingCategory>,
    pub radius_km: f64,
    #[serde(default)]
    pub search: Option<String>,
    /// Hides the requester's own listings.
    #[serde(default)]
    pub exclude_owner: Option<UserId>,
    #[serde(default)]
    pub available_on: Option<Weekday>,
}

impl FeedCriteria {
    pub fn new(config: &MarketplaceConfig) -> Self {
        Self {
            categories: Vec::new(),
            radius_km: config.default_radius_km,
            search: None,
            exclude_owner: None,
            available_on: None,
        }
    }

    pub fn with_categories(
        mut self,
        categories: impl IntoIterator<Item = ListingCategory>,
    ) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn excluding(mut self, owner: UserId) -> Self {
        self.exclude_owner = Some(owner);
        self
    }

    fn wants(&self, category: ListingCategory) -> bool {
        self.categories.is_empty() || self.categories.contains(&category)
    }
}

impl Default for FeedCriteria {
    fn default() -> Self {
        Self::new(&MarketplaceConfig::default())
    }
}

/// A listing that survived filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry<'a> {
    pub listing: &'a Listing,
    pub store: &'a Store,
    /// Kilometers from the buyer, rounded to 2 decimals. `None` when the
    /// buyer's location is unknown.
    pub distance_km: Option<f64>,
}

/// Round a distance to 2 decimals for display.
pub fn round_distance(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Select and rank the listings a buyer may see.
///
/// Without a buyer location no distance filtering happens and results are
/// newest-first; with one, results are nearest-first. Out-of-range
/// coordinates count as an unknown location.
pub fn filter_listings<'a, I>(
    buyer: Option<&GeoLocation>,
    listings: I,
    stores: &'a BTreeMap<StoreId, Store>,
    criteria: &FeedCriteria,
) -> Vec<FeedEntry<'a>>
where
    I: IntoIterator<Item = &'a Listing>,
{
    let buyer = match buyer {
        Some(location) if !location.is_valid() => {
            tracing::warn!(
                latitude = location.latitude,
                longitude = location.longitude,
                "buyer location out of range, ranking without distance"
            );
            None
        }
        other => other,
    };

    let search = criteria
        .search
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());

    let mut candidates = 0usize;
    let mut entries: Vec<FeedEntry<'a>> = listings
        .into_iter()
        .inspect(|_| candidates += 1)
        .filter(|listing| listing.active && listing.has_fulfilment())
        .filter_map(|listing| {
            let store = stores.get(&listing.store_id)?;
            if !store.is_externally_visible() {
                return None;
            }
            if criteria.exclude_owner.as_ref() == Some(&listing.owner) {
                return None;
            }
            Some((listing, store))
        })
        .filter(|(listing, _)| criteria.wants(listing.category))
        .filter(|(listing, _)| search.map_or(true, |q| listing.matches_search(q)))
        .filter(|(listing, _)| {
            criteria
                .available_on
                .map_or(true, |day| listing.is_available_on(day))
        })
        .filter_map(|(listing, store)| match buyer {
            Some(buyer) => {
                let distance = buyer.distance_km(&store.location);
                (distance <= criteria.radius_km).then(|| FeedEntry {
                    listing,
                    store,
                    distance_km: Some(round_distance(distance)),
                })
            }
            None => Some(FeedEntry {
                listing,
                store,
                distance_km: None,
            }),
        })
        .collect();

    entries.sort_by(compare_entries);

    tracing::debug!(
        candidates,
        returned = entries.len(),
        located = buyer.is_some(),
        "listing feed filtered"
    );
    entries
}

fn compare_entries(a: &FeedEntry<'_>, b: &FeedEntry<'_>) -> Ordering {
    let by_distance = match (a.distance_km, b.distance_km) {
        (Some(da), Some(db)) => da.total_cmp(&db),
        _ => Ordering::Equal,
    };
    by_distance
        .then_with(|| b.listing.created_at.cmp(&a.listing.created_at))
        .then_with(|| a.listing.id.cmp(&b.listing.id))
}
