use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{AcceptanceCutoff, MarketplaceConfig};
use crate::error::{EngineError, Result};
use crate::identity::{UserId, UserRole};
use crate::product::{DeliveryMethod, Listing, ListingId, ListingPricing};

/// Unique order identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an order.
///
/// `Pending -> {Accepted, Rejected, Cancelled}`, `Accepted -> {Completed, Cancelled}`.
/// The other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Completed,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if transitioning from self to `next` is valid.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Accepted)
                | (OrderStatus::Pending, OrderStatus::Rejected)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Accepted, OrderStatus::Completed)
                | (OrderStatus::Accepted, OrderStatus::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Completed => "completed",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A transition a buyer or seller can request.
///
/// Expiry is not here: it is applied by the engine itself, never requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Accept,
    Reject,
    Complete,
    Cancel,
}

impl OrderAction {
    pub fn target(self) -> OrderStatus {
        match self {
            OrderAction::Accept => OrderStatus::Accepted,
            OrderAction::Reject => OrderStatus::Rejected,
            OrderAction::Complete => OrderStatus::Completed,
            OrderAction::Cancel => OrderStatus::Cancelled,
        }
    }

    pub fn allows(self, role: UserRole) -> bool {
        match self {
            OrderAction::Accept | OrderAction::Reject | OrderAction::Complete => {
                role == UserRole::Seller
            }
            OrderAction::Cancel => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderAction::Accept => "accept",
            OrderAction::Reject => "reject",
            OrderAction::Complete => "complete",
            OrderAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the buyer picked on the listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSelection {
    Units(u32),
    Party { headcount: u32 },
}

/// Regular and party orders share one lifecycle and differ only in pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OrderKind {
    Regular { quantity: u32, unit_price: u64 },
    Party { headcount: u32, package_price: u64 },
}

impl OrderKind {
    pub fn quantity(&self) -> u32 {
        match self {
            OrderKind::Regular { quantity, .. } => *quantity,
            OrderKind::Party { .. } => 1,
        }
    }

    pub fn subtotal(&self) -> u64 {
        match self {
            OrderKind::Regular {
                quantity,
                unit_price,
            } => unit_price.saturating_mul(u64::from(*quantity)),
            OrderKind::Party { package_price, .. } => *package_price,
        }
    }
}

/// Where and how to reach the buyer for delivery orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: String,
    pub phone: String,
}

/// Price breakdown fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: u64,
    pub delivery_fee: u64,
    pub total: u64,
}

/// Flat surcharge for `method`; zero for pickup.
pub fn delivery_fee(method: DeliveryMethod, config: &MarketplaceConfig) -> u64 {
    match method {
        DeliveryMethod::Pickup => 0,
        DeliveryMethod::Delivery => config.delivery_fee,
    }
}

pub fn price(
    kind: &OrderKind,
    method: DeliveryMethod,
    config: &MarketplaceConfig,
) -> PriceBreakdown {
    let subtotal = kind.subtotal();
    let delivery_fee = delivery_fee(method, config);
    PriceBreakdown {
        subtotal,
        delivery_fee,
        total: subtotal.saturating_add(delivery_fee),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Buyer,
    Seller,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// A participant cancelled.
    ByActor,
    /// The seller did not answer before `expires_at`.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub by: CancelledBy,
    pub reason: CancelReason,
    pub at: DateTime<Utc>,
    /// Owed by the canceller, in the smallest currency unit.
    pub charge: u64,
}

/// A buyer's request to place an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub id: OrderId,
    pub buyer: UserId,
    pub selection: OrderSelection,
    pub delivery_method: DeliveryMethod,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    #[serde(default)]
    pub delivery: Option<DeliveryDetails>,
}

/// An order placed by a buyer against a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub listing_id: ListingId,
    pub buyer: UserId,
    pub seller: UserId,
    #[serde(flatten)]
    pub kind: OrderKind,
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub delivery: Option<DeliveryDetails>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub pricing: PriceBreakdown,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    /// Set only while the order is pending.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancellation: Option<Cancellation>,
}

impl Order {
    /// Validate `request` against `listing` and build a pending order.
    pub fn create(
        listing: &Listing,
        request: OrderRequest,
        now: DateTime<Utc>,
        config: &MarketplaceConfig,
    ) -> Result<Order> {
        if !listing.active {
            return Err(EngineError::ListingInactive {
                listing_id: listing.id.clone(),
            });
        }
        if request.buyer == listing.owner {
            return Err(EngineError::UnauthorizedActor {
                actor: request.buyer,
                action: "order from their own listing",
            });
        }

        let kind = resolve_kind(listing, request.selection)?;

        if !listing.offers(request.delivery_method) {
            return Err(EngineError::DeliveryMethodNotOffered {
                method: request.delivery_method,
            });
        }
        if request.delivery_method == DeliveryMethod::Delivery {
            check_delivery_details(request.delivery.as_ref())?;
        }

        let pricing = price(&kind, request.delivery_method, config);
        let expires_at = pending_expiry(now, config);

        let order = Order {
            id: request.id,
            listing_id: listing.id.clone(),
            buyer: request.buyer,
            seller: listing.owner.clone(),
            kind,
            delivery_method: request.delivery_method,
            delivery: request.delivery,
            scheduled_date: request.scheduled_date,
            scheduled_time: request.scheduled_time,
            pricing,
            status: OrderStatus::Pending,
            created_at: now,
            expires_at: Some(expires_at),
            accepted_at: None,
            rejected_at: None,
            completed_at: None,
            cancellation: None,
        };
        tracing::debug!(
            order_id = %order.id,
            listing_id = %order.listing_id,
            total = order.pricing.total,
            %expires_at,
            "order created"
        );
        Ok(order)
    }

    pub fn quantity(&self) -> u32 {
        self.kind.quantity()
    }

    pub fn total_price(&self) -> u64 {
        self.pricing.total
    }

    /// Which side of this order `user` is on, if any.
    pub fn role_of(&self, user: &UserId) -> Option<UserRole> {
        if *user == self.seller {
            Some(UserRole::Seller)
        } else if *user == self.buyer {
            Some(UserRole::Buyer)
        } else {
            None
        }
    }

    /// The other participant, for addressing chat messages.
    pub fn counterparty(&self, user: &UserId) -> Option<&UserId> {
        match self.role_of(user)? {
            UserRole::Buyer => Some(&self.seller),
            UserRole::Seller => Some(&self.buyer),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::Pending && self.expires_at.is_some_and(|at| now >= at)
    }

    /// Status as of `now`, counting an overdue pending order as cancelled.
    pub fn status_at(&self, now: DateTime<Utc>) -> OrderStatus {
        if self.is_expired_at(now) {
            OrderStatus::Cancelled
        } else {
            self.status
        }
    }

    /// Apply the expiry effect if it is due. Returns true if the order changed.
    ///
    /// Callers run this on every read or action against a pending order, so
    /// no timer is needed.
    pub fn settle(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_expired_at(now) {
            return false;
        }
        let expired_at = self.expires_at.take().unwrap_or(now);
        self.status = OrderStatus::Cancelled;
        self.cancellation = Some(Cancellation {
            by: CancelledBy::System,
            reason: CancelReason::Expired,
            at: expired_at,
            charge: 0,
        });
        tracing::info!(order_id = %self.id, %expired_at, "pending order expired");
        true
    }

    /// A settled copy for read-only views.
    pub fn view(&self, now: DateTime<Utc>) -> Order {
        let mut order = self.clone();
        order.settle(now);
        order
    }

    /// Perform `action` on behalf of `actor`.
    ///
    /// Expiry is settled first. If that cancels the order the action fails
    /// with [`EngineError::OrderExpired`] and the expiry stays applied, so
    /// callers should persist the order whenever [`Order::settle`] would have
    /// changed it. Any other failure leaves the order untouched.
    pub fn apply(
        &mut self,
        action: OrderAction,
        actor: &UserId,
        now: DateTime<Utc>,
        config: &MarketplaceConfig,
    ) -> Result<OrderStatus> {
        let expired_at = self.expires_at;
        if self.settle(now) {
            return Err(EngineError::OrderExpired {
                order_id: self.id.clone(),
                expired_at: expired_at.unwrap_or(now),
            });
        }

        let role = self
            .role_of(actor)
            .filter(|role| action.allows(*role))
            .ok_or_else(|| EngineError::UnauthorizedActor {
                actor: actor.clone(),
                action: action.as_str(),
            })?;

        let from = self.status;
        let to = action.target();
        if !from.can_transition_to(to) {
            return Err(EngineError::InvalidTransition {
                order_id: self.id.clone(),
                from,
                action,
            });
        }

        match action {
            OrderAction::Accept => self.accepted_at = Some(now),
            OrderAction::Reject => self.rejected_at = Some(now),
            OrderAction::Complete => self.completed_at = Some(now),
            OrderAction::Cancel => {
                let (by, charge) = match role {
                    UserRole::Buyer if from == OrderStatus::Accepted => {
                        (CancelledBy::Buyer, config.buyer_cancellation_charge)
                    }
                    UserRole::Buyer => (CancelledBy::Buyer, 0),
                    UserRole::Seller => (CancelledBy::Seller, 0),
                };
                self.cancellation = Some(Cancellation {
                    by,
                    reason: CancelReason::ByActor,
                    at: now,
                    charge,
                });
            }
        }
        self.status = to;
        self.expires_at = None;

        tracing::debug!(order_id = %self.id, %from, %to, actor = %actor, "order transition");
        Ok(to)
    }

    pub fn accept(
        &mut self,
        seller: &UserId,
        now: DateTime<Utc>,
        config: &MarketplaceConfig,
    ) -> Result<OrderStatus> {
        self.apply(OrderAction::Accept, seller, now, config)
    }

    pub fn reject(
        &mut self,
        seller: &UserId,
        now: DateTime<Utc>,
        config: &MarketplaceConfig,
    ) -> Result<OrderStatus> {
        self.apply(OrderAction::Reject, seller, now, config)
    }

    pub fn complete(
        &mut self,
        seller: &UserId,
        now: DateTime<Utc>,
        config: &MarketplaceConfig,
    ) -> Result<OrderStatus> {
        self.apply(OrderAction::Complete, seller, now, config)
    }

    pub fn cancel(
        &mut self,
        actor: &UserId,
        now: DateTime<Utc>,
        config: &MarketplaceConfig,
    ) -> Result<OrderStatus> {
        self.apply(OrderAction::Cancel, actor, now, config)
    }
}

/// Settle every overdue pending order. Returns how many changed.
pub fn settle_all<'a>(
    orders: impl IntoIterator<Item = &'a mut Order>,
    now: DateTime<Utc>,
) -> usize {
    orders
        .into_iter()
        .map(|order| order.settle(now))
        .filter(|changed| *changed)
        .count()
}

fn resolve_kind(listing: &Listing, selection: OrderSelection) -> Result<OrderKind> {
    match (&listing.pricing, selection) {
        (
            ListingPricing::PerUnit {
                unit_price,
                min_quantity,
                max_quantity,
            },
            OrderSelection::Units(quantity),
        ) => {
            if quantity < *min_quantity {
                return Err(EngineError::BelowMinimumQuantity {
                    requested: quantity,
                    minimum: *min_quantity,
                });
            }
            if let Some(maximum) = *max_quantity {
                if quantity > maximum {
                    return Err(EngineError::AboveMaximumQuantity {
                        requested: quantity,
                        maximum,
                    });
                }
            }
            Ok(OrderKind::Regular {
                quantity,
                unit_price: *unit_price,
            })
        }
        (ListingPricing::PartyPackages(packages), OrderSelection::Party { headcount }) => {
            let package_price = packages
                .get(&headcount)
                .copied()
                .ok_or(EngineError::UnknownPartyPackage { headcount })?;
            Ok(OrderKind::Party {
                headcount,
                package_price,
            })
        }
        _ => Err(EngineError::SelectionMismatch {
            category: listing.category,
        }),
    }
}

fn check_delivery_details(details: Option<&DeliveryDetails>) -> Result<()> {
    let details = details.ok_or(EngineError::MissingDeliveryDetails {
        missing: "delivery address and phone number",
    })?;
    if details.address.trim().is_empty() {
        return Err(EngineError::MissingDeliveryDetails {
            missing: "delivery address",
        });
    }
    if details.phone.trim().is_empty() {
        return Err(EngineError::MissingDeliveryDetails {
            missing: "phone number",
        });
    }
    Ok(())
}

/// When a newly created order stops waiting for the seller.
fn pending_expiry(created_at: DateTime<Utc>, config: &MarketplaceConfig) -> DateTime<Utc> {
    let deadline = created_at + config.pending_order_ttl();
    match config.acceptance_cutoff {
        Some(cutoff) => apply_cutoff(created_at, deadline, cutoff).unwrap_or(deadline),
        None => deadline,
    }
}

/// Orders placed after the local cutoff wait until the next morning;
/// deadlines that would run past the cutoff are pulled back to it.
fn apply_cutoff(
    created_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    cutoff: AcceptanceCutoff,
) -> Option<DateTime<Utc>> {
    let offset = Duration::minutes(i64::from(cutoff.utc_offset_minutes));
    let local_now = created_at.naive_utc() + offset;
    let local_deadline = deadline.naive_utc() + offset;
    let today = local_now.date();

    let local_expiry = if local_now.hour() >= cutoff.cutoff_hour {
        today.succ_opt()?.and_hms_opt(cutoff.resume_hour, 0, 0)?
    } else {
        let cutoff_today = today.and_hms_opt(cutoff.cutoff_hour, 0, 0)?;
        local_deadline.min(cutoff_today)
    };

    Some(Utc.from_utc_datetime(&(local_expiry - offset)))
}
