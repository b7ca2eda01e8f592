use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::identity::UserId;
use crate::order::{OrderAction, OrderId, OrderStatus};
use crate::product::{DeliveryMethod, ListingCategory, ListingId};

/// Every way a requested engine operation can be refused.
///
/// All variants are detected before any mutation and are deterministic for
/// the same inputs, so retrying without re-fetching state is pointless.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("order {order_id} cannot {action} while {from}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        action: OrderAction,
    },
    #[error("order {order_id} expired at {expired_at}")]
    OrderExpired {
        order_id: OrderId,
        expired_at: DateTime<Utc>,
    },
    #[error("quantity {requested} is below the minimum of {minimum}")]
    BelowMinimumQuantity { requested: u32, minimum: u32 },
    #[error("quantity {requested} is above the maximum of {maximum}")]
    AboveMaximumQuantity { requested: u32, maximum: u32 },
    #[error("delivery requires a {missing}")]
    MissingDeliveryDetails { missing: &'static str },
    #[error("listing does not offer {method}")]
    DeliveryMethodNotOffered { method: DeliveryMethod },
    #[error("listing {listing_id} is not active")]
    ListingInactive { listing_id: ListingId },
    #[error("no party package for {headcount} guests")]
    UnknownPartyPackage { headcount: u32 },
    #[error("selection does not fit a {category} listing")]
    SelectionMismatch { category: ListingCategory },
    #[error("invalid listing: {0}")]
    InvalidListing(&'static str),
    #[error("{actor} is not allowed to {action}")]
    UnauthorizedActor { actor: UserId, action: &'static str },
    #[error("chat for order {order_id} is closed")]
    WindowClosed {
        order_id: OrderId,
        closed_at: Option<DateTime<Utc>>,
    },
    #[error("message is empty")]
    EmptyMessage,
    #[error("{user} is not part of this order")]
    NotAParticipant { user: UserId },
    #[error("FSSAI license number must be 14 digits")]
    InvalidLicenseNumber,
    #[error("rating {rating} is outside 1..=5")]
    InvalidRating { rating: u8 },
    #[error("order {order_id} cannot be reviewed while {status}")]
    ReviewNotAllowed {
        order_id: OrderId,
        status: OrderStatus,
    },
    #[error("order {order_id} was not placed on listing {listing_id}")]
    ListingMismatch {
        order_id: OrderId,
        listing_id: ListingId,
    },
    #[error("order {order_id} has already been reviewed")]
    AlreadyReviewed { order_id: OrderId },
}

impl EngineError {
    /// Stable machine-readable code for UI message lookup.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::OrderExpired { .. } => "order_expired",
            EngineError::BelowMinimumQuantity { .. } => "below_minimum_quantity",
            EngineError::AboveMaximumQuantity { .. } => "above_maximum_quantity",
            EngineError::MissingDeliveryDetails { .. } => "missing_delivery_details",
            EngineError::DeliveryMethodNotOffered { .. } => "delivery_method_not_offered",
            EngineError::ListingInactive { .. } => "listing_inactive",
            EngineError::UnknownPartyPackage { .. } => "unknown_party_package",
            EngineError::SelectionMismatch { .. } => "selection_mismatch",
            EngineError::InvalidListing(_) => "invalid_listing",
            EngineError::UnauthorizedActor { .. } => "unauthorized_actor",
            EngineError::WindowClosed { .. } => "window_closed",
            EngineError::EmptyMessage => "empty_message",
            EngineError::NotAParticipant { .. } => "not_a_participant",
            EngineError::InvalidLicenseNumber => "invalid_license_number",
            EngineError::InvalidRating { .. } => "invalid_rating",
            EngineError::ReviewNotAllowed { .. } => "review_not_allowed",
            EngineError::ListingMismatch { .. } => "listing_mismatch",
            EngineError::AlreadyReviewed { .. } => "already_reviewed",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
