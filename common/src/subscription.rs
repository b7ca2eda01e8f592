use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::storefront::Store;

/// Standing of a seller's paid subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    /// Payment lapsed but still inside the leniency window. Visible, at risk.
    GracePeriod,
    Expired,
}

impl SubscriptionStatus {
    /// Derive the standing from the paid-through time.
    ///
    /// A seller who never subscribed (`None`) is `Expired`.
    pub fn at(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>, grace: Duration) -> Self {
        match expires_at {
            None => SubscriptionStatus::Expired,
            Some(expires_at) if now < expires_at => SubscriptionStatus::Active,
            Some(expires_at) if now < expires_at + grace => SubscriptionStatus::GracePeriod,
            Some(_) => SubscriptionStatus::Expired,
        }
    }

    pub fn grants_visibility(self) -> bool {
        self != SubscriptionStatus::Expired
    }
}

/// What the seller dashboard shows about subscription standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerStanding {
    pub status: SubscriptionStatus,
    /// Store and listings appear in buyer feeds.
    pub visible: bool,
    /// Seller should be warned to renew.
    pub at_risk: bool,
}

/// A store is shown to buyers only while the seller has it online and the
/// subscription has not expired.
pub fn is_externally_visible(store: &Store) -> bool {
    store.store_active && store.subscription_status.grants_visibility()
}

pub fn seller_standing(store: &Store) -> SellerStanding {
    SellerStanding {
        status: store.subscription_status,
        visible: is_externally_visible(store),
        at_risk: store.subscription_status == SubscriptionStatus::GracePeriod,
    }
}
