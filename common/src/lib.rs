//! Matching and order-lifecycle engine for the Foodambo hyperlocal food
//! marketplace.
//!
//! Everything here is a pure function of its inputs: records, the acting
//! user's id, and `now` are always passed in by the caller.

pub mod chat;
pub mod compliance;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod location;
pub mod message;
pub mod order;
pub mod product;
pub mod review;
pub mod storefront;
pub mod subscription;

pub use config::MarketplaceConfig;
pub use directory::{filter_listings, FeedCriteria, FeedEntry};
pub use error::{EngineError, Result};
pub use identity::{UserId, UserRole};
pub use location::GeoLocation;
pub use message::{ChatLog, ChatMessage, MessageId};
pub use order::{Order, OrderAction, OrderId, OrderRequest, OrderSelection, OrderStatus};
pub use product::{DeliveryMethod, Listing, ListingCategory, ListingId, ListingPricing};
pub use storefront::{Store, StoreId};
pub use subscription::SubscriptionStatus;
