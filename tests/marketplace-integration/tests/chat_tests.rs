use chrono::Duration;

use foodambo_common::error::EngineError;
use foodambo_common::order::{OrderAction, OrderSelection};
use foodambo_common::product::{DeliveryMethod, ListingCategory};
use foodambo_integration::harness::TestHarness;

#[test]
fn chat_opens_on_placement_and_closes_on_rejection() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 60);
    let id = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();

    h.send(&id, &rohan.id, "Is it ready by one?").unwrap();
    h.act(&id, OrderAction::Reject, &asha.id).unwrap();

    assert!(!h.chat_open(&id));
    let err = h.send(&id, &asha.id, "Sorry, sold out").unwrap_err();
    assert_eq!(
        err,
        EngineError::WindowClosed {
            order_id: id.clone(),
            closed_at: h.orders[&id].rejected_at,
        }
    );
    assert_eq!(h.history(&id).len(), 1);
}

#[test]
fn expired_order_closes_chat_before_any_sweep() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 60);
    let id = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();

    h.advance(Duration::hours(1));
    assert!(!h.chat_open(&id));
    let err = h.send(&id, &rohan.id, "Hello?").unwrap_err();
    assert_eq!(err.code(), "window_closed");
}

#[test]
fn only_participants_can_write() {
    let mut h = TestHarness::setup();
    let (asha, meera) = (h.asha.clone(), h.meera.clone());
    let (rohan, priya) = (h.rohan.clone(), h.priya.clone());
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 60);
    let id = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();

    for outsider in [&meera.id, &priya.id] {
        let err = h.send(&id, outsider, "hi").unwrap_err();
        assert_eq!(err.code(), "not_a_participant");
    }
    let err = h.send(&id, &rohan.id, "   ").unwrap_err();
    assert_eq!(err, EngineError::EmptyMessage);
    assert!(h.history(&id).is_empty());
}

#[test]
fn unread_tracking_per_reader() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 60);
    let id = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();

    h.send(&id, &rohan.id, "Hi").unwrap();
    h.advance(Duration::minutes(1));
    h.send(&id, &rohan.id, "Can you do 2pm?").unwrap();
    h.advance(Duration::minutes(1));
    h.send(&id, &asha.id, "Yes").unwrap();

    let log = h.chats.get_mut(&id).unwrap();
    assert_eq!(log.unread_for(&asha.id).count(), 2);
    assert_eq!(log.mark_read_by(&asha.id), 2);
    assert_eq!(log.unread_for(&asha.id).count(), 0);
    assert_eq!(log.unread_for(&rohan.id).count(), 1);
}

#[test]
fn polling_reader_merges_without_duplicates() {
    let mut h = TestHarness::setup();
    let asha = h.asha.clone();
    let rohan = h.rohan.clone();
    let poha = h.add_listing(&asha, "Kanda Poha", ListingCategory::FreshFood, 60);
    let id = h
        .place_order(&rohan, &poha, OrderSelection::Units(1), DeliveryMethod::Pickup)
        .unwrap();

    h.send(&id, &rohan.id, "Hi").unwrap();
    let mut client = h.chats[&id].clone();

    h.advance(Duration::minutes(1));
    h.send(&id, &asha.id, "Hello").unwrap();

    let fetched = h.history(&id).to_vec();
    assert_eq!(client.merge(fetched.clone()), 1);
    assert_eq!(client.merge(fetched), 0);
    assert_eq!(client.messages(), h.history(&id));

    let json = serde_json::to_string(&client).unwrap();
    let restored: foodambo_common::message::ChatLog = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, client);
}
