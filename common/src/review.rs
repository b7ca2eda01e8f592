use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::identity::UserId;
use crate::order::{Order, OrderId, OrderStatus};
use crate::product::Listing;
use crate::storefront::StoreId;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub String);

/// A buyer's review of a completed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub order_id: OrderId,
    pub store_id: StoreId,
    pub buyer: UserId,
    /// 1 to 5 stars.
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Only the buyer of a completed order may review it. The store is taken
    /// from the listing the order was placed on.
    pub fn create(
        id: ReviewId,
        order: &Order,
        listing: &Listing,
        author: &UserId,
        rating: u8,
        comment: String,
        now: DateTime<Utc>,
    ) -> Result<Review> {
        if order.listing_id != listing.id {
            return Err(EngineError::ListingMismatch {
                order_id: order.id.clone(),
                listing_id: listing.id.clone(),
            });
        }
        if *author != order.buyer {
            return Err(EngineError::UnauthorizedActor {
                actor: author.clone(),
                action: "review",
            });
        }
        if order.status != OrderStatus::Completed {
            return Err(EngineError::ReviewNotAllowed {
                order_id: order.id.clone(),
                status: order.status,
            });
        }
        if !(1..=5).contains(&rating) {
            return Err(EngineError::InvalidRating { rating });
        }

        Ok(Review {
            id,
            order_id: order.id.clone(),
            store_id: listing.store_id.clone(),
            buyer: author.clone(),
            rating,
            comment,
            photos: Vec::new(),
            created_at: now,
        })
    }

    /// Each order gets one review. Call before storing a new one.
    pub fn ensure_first<'a>(
        existing: impl IntoIterator<Item = &'a Review>,
        order_id: &OrderId,
    ) -> Result<()> {
        if existing.into_iter().any(|r| r.order_id == *order_id) {
            return Err(EngineError::AlreadyReviewed {
                order_id: order_id.clone(),
            });
        }
        Ok(())
    }
}

/// Aggregate rating shown on a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreRating {
    /// Mean star rating rounded to one decimal, 0.0 with no reviews.
    pub average: f64,
    pub total_reviews: u32,
}

impl StoreRating {
    /// Only the first review seen for each order counts.
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> StoreRating {
        let mut seen = HashSet::new();
        let (sum, count) = reviews
            .into_iter()
            .filter(|r| seen.insert(r.order_id.clone()))
            .fold((0u64, 0u32), |(sum, count), r| {
                (sum + u64::from(r.rating), count + 1)
            });
        if count == 0 {
            return StoreRating::default();
        }
        let mean = sum as f64 / f64::from(count);
        StoreRating {
            average: (mean * 10.0).round() / 10.0,
            total_reviews: count,
        }
    }
}
