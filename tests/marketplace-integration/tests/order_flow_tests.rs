use chrono::Duration;

use foodambo_common::error::EngineError;
use foodambo_common::order::{CancelReason, CancelledBy, OrderAction, OrderSelection, OrderStatus};
use foodambo_common::product::{DeliveryMethod, ListingCategory};
use foodambo_integration::harness::TestHarness;

/// Browse, order, accept, complete, and chat inside the post-completion window.
#[test]
fn pickup_order_end_to_end() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 100);

    let criteria = h
        .criteria_for(&rohan)
        .with_categories([ListingCategory::FreshFood]);
    let feed = h.feed(&rohan, &criteria);
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].listing.id, poha);
    let distance = feed[0].distance_km.unwrap();
    assert!(distance > 1.0 && distance < 2.0, "distance was {distance}");

    let placed_at = h.now;
    let id = h
        .place_order(&rohan, &poha, OrderSelection::Units(2), DeliveryMethod::Pickup)
        .unwrap();
    let order = h.order(&id);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_price(), 200);
    assert_eq!(order.pricing.delivery_fee, 0);
    assert_eq!(order.expires_at, Some(placed_at + Duration::hours(1)));

    h.advance(Duration::minutes(15));
    assert_eq!(
        h.act(&id, OrderAction::Accept, &asha.id).unwrap(),
        OrderStatus::Accepted
    );
    h.send(&id, &rohan.id, "Less oil please").unwrap();
    h.send(&id, &asha.id, "Sure!").unwrap();

    h.advance(Duration::hours(2));
    assert_eq!(
        h.act(&id, OrderAction::Complete, &asha.id).unwrap(),
        OrderStatus::Completed
    );
    let completed_at = h.now;

    h.advance(Duration::hours(3) + Duration::minutes(59));
    assert!(h.chat_open(&id));
    h.send(&id, &rohan.id, "Loved it, thanks").unwrap();

    h.advance(Duration::minutes(1));
    assert_eq!(h.now, completed_at + Duration::hours(4));
    assert!(!h.chat_open(&id));
    let err = h.send(&id, &asha.id, "Come again!").unwrap_err();
    assert_eq!(err.code(), "window_closed");

    // History stays readable after the window closes.
    let bodies: Vec<_> = h.history(&id).iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, ["Less oil please", "Sure!", "Loved it, thanks"]);
}

#[test]
fn delivery_adds_the_flat_fee() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let thali = h.add_listing(&asha, "Veg Thali", ListingCategory::FreshFood, 100);

    let id = h
        .place_order(&rohan, &thali, OrderSelection::Units(3), DeliveryMethod::Delivery)
        .unwrap();
    let order = h.order(&id);
    assert_eq!(order.pricing.subtotal, 300);
    assert_eq!(order.pricing.delivery_fee, 30);
    assert_eq!(order.total_price(), 330);
    assert!(order.delivery.is_some());
}

/// The seller answers exactly at the deadline and loses the race.
#[test]
fn accept_after_deadline_reports_expiry() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 100);
    let id = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();
    let deadline = h.order(&id).expires_at.unwrap();

    h.advance(Duration::hours(1));
    let err = h.act(&id, OrderAction::Accept, &asha.id).unwrap_err();
    assert_eq!(
        err,
        EngineError::OrderExpired {
            order_id: id.clone(),
            expired_at: deadline,
        }
    );

    // The expiry was persisted even though the action failed.
    let stored = &h.orders[&id];
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert_eq!(stored.expires_at, None);
    let cancellation = stored.cancellation.unwrap();
    assert_eq!(cancellation.by, CancelledBy::System);
    assert_eq!(cancellation.reason, CancelReason::Expired);
    assert_eq!(cancellation.at, deadline);

    // A retry sees a plain terminal order.
    let err = h.act(&id, OrderAction::Accept, &asha.id).unwrap_err();
    assert_eq!(err.code(), "invalid_transition");
}

#[test]
fn accept_one_second_before_deadline_wins() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 100);
    let id = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();

    h.advance(Duration::hours(1) - Duration::seconds(1));
    h.act(&id, OrderAction::Accept, &asha.id).unwrap();

    // Accepted orders never expire.
    h.advance(Duration::days(2));
    let order = h.order(&id);
    assert_eq!(order.status, OrderStatus::Accepted);
    assert_eq!(order.expires_at, None);
}

#[test]
fn sweep_settles_only_overdue_orders() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 100);

    let early = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();
    h.advance(Duration::minutes(30));
    let late = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();
    let answered = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();
    h.act(&answered, OrderAction::Reject, &asha.id).unwrap();

    h.advance(Duration::minutes(45));
    assert_eq!(h.sweep(), 1);
    assert_eq!(h.orders[&early].status, OrderStatus::Cancelled);
    assert_eq!(h.orders[&late].status, OrderStatus::Pending);
    assert_eq!(h.orders[&answered].status, OrderStatus::Rejected);

    // Running it again changes nothing.
    assert_eq!(h.sweep(), 0);
}

#[test]
fn party_order_priced_by_package() {
    let mut h = TestHarness::setup();
    let meera = h.meera.clone();
    let rohan = h.rohan.clone();
    let platter = h.add_party_listing(&meera, "Birthday Platter", &[(10, 1500), (25, 3500)]);

    let id = h
        .place_order(
            &rohan,
            &platter,
            OrderSelection::Party { headcount: 25 },
            DeliveryMethod::Delivery,
        )
        .unwrap();
    let order = h.order(&id);
    assert_eq!(order.quantity(), 1);
    assert_eq!(order.pricing.subtotal, 3500);
    assert_eq!(order.total_price(), 3530);

    let err = h
        .place_order(
            &rohan,
            &platter,
            OrderSelection::Party { headcount: 15 },
            DeliveryMethod::Pickup,
        )
        .unwrap_err();
    assert_eq!(err, EngineError::UnknownPartyPackage { headcount: 15 });

    let err = h
        .place_order(&rohan, &platter, OrderSelection::Units(2), DeliveryMethod::Pickup)
        .unwrap_err();
    assert_eq!(err.code(), "selection_mismatch");

    // Same lifecycle as a regular order.
    h.act(&id, OrderAction::Accept, &meera.id).unwrap();
    h.act(&id, OrderAction::Complete, &meera.id).unwrap();
    assert_eq!(h.order(&id).status, OrderStatus::Completed);
}

#[test]
fn cancellation_charges() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 100);

    let pending = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();
    h.act(&pending, OrderAction::Cancel, &rohan.id).unwrap();
    assert_eq!(h.orders[&pending].cancellation.unwrap().charge, 0);

    let accepted = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();
    h.act(&accepted, OrderAction::Accept, &asha.id).unwrap();
    h.act(&accepted, OrderAction::Cancel, &rohan.id).unwrap();
    let cancellation = h.orders[&accepted].cancellation.unwrap();
    assert_eq!(cancellation.by, CancelledBy::Buyer);
    assert_eq!(cancellation.charge, 50);

    let by_seller = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();
    h.act(&by_seller, OrderAction::Accept, &asha.id).unwrap();
    h.act(&by_seller, OrderAction::Cancel, &asha.id).unwrap();
    let cancellation = h.orders[&by_seller].cancellation.unwrap();
    assert_eq!(cancellation.by, CancelledBy::Seller);
    assert_eq!(cancellation.charge, 0);
}

#[test]
fn refused_actions_leave_the_order_untouched() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let meera = h.meera.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 100);
    let id = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();
    let before = h.orders[&id].clone();

    let err = h.act(&id, OrderAction::Accept, &rohan.id).unwrap_err();
    assert_eq!(err.code(), "unauthorized_actor");
    let err = h.act(&id, OrderAction::Reject, &meera.id).unwrap_err();
    assert_eq!(err.code(), "unauthorized_actor");
    let err = h.act(&id, OrderAction::Complete, &asha.id).unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidTransition {
            order_id: id.clone(),
            from: OrderStatus::Pending,
            action: OrderAction::Complete,
        }
    );

    assert_eq!(h.orders[&id], before);
}

#[test]
fn sellers_cannot_order_their_own_listings() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 100);

    let as_buyer = foodambo_integration::harness::Buyer {
        name: asha.name.clone(),
        id: asha.id.clone(),
        location: rohan.location,
    };
    let err = h
        .place_order(&as_buyer, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap_err();
    assert_eq!(err.code(), "unauthorized_actor");
    assert!(h.orders.is_empty());
}

#[test]
fn inactive_listing_cannot_be_ordered() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 100);
    h.listing_mut(&poha).active = false;

    let err = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap_err();
    assert_eq!(err, EngineError::ListingInactive { listing_id: poha });
}
