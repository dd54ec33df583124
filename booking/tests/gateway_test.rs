//! Named-call boundary: argument handling, routing and rendered results.

#![allow(clippy::unwrap_used)] // Tests can unwrap

mod common;

use common::Harness;
use seatledger_booking::{BookingError, Reservation, Show};
use serde_json::Value;

async fn call(h: &Harness, function: &str, args: &[&str]) -> Result<String, BookingError> {
    h.gateway().invoke(function, args).await
}

/// Upsert then lookup returns the stored record as camel-cased JSON.
#[tokio::test]
async fn upsert_and_lookup_show() {
    let h = Harness::new();

    let created = call(&h, "upsertShow", &["Atlas", "6pm-9pm", "100", "3", "FALSE"])
        .await
        .unwrap();
    assert_eq!(created, "Show record created: Atlas");

    let json: Value =
        serde_json::from_str(&call(&h, "lookupShowByName", &["Atlas"]).await.unwrap()).unwrap();
    assert_eq!(json["showName"], "Atlas");
    assert_eq!(json["timeSlot"], "6pm-9pm");
    assert_eq!(json["totalCapacity"], 100);
    assert_eq!(json["remainingCapacity"], 3);
    assert_eq!(json["soldOut"], false);
    assert_eq!(json["lastModified"], "2025-01-01T09:00:00Z");
}

/// Upserting a new slot under an existing name replaces the record.
#[tokio::test]
async fn upsert_replaces_previous_slot() {
    let h = Harness::new();
    call(&h, "upsertShow", &["Atlas", "9am-12pm", "100", "100", "false"])
        .await
        .unwrap();
    call(&h, "upsertShow", &["Atlas", "6pm-9pm", "50", "50", "false"])
        .await
        .unwrap();

    let show: Show =
        serde_json::from_str(&call(&h, "lookupShowByName", &["Atlas"]).await.unwrap()).unwrap();
    assert_eq!(show.time_slot, "6pm-9pm");
    assert_eq!(show.total_capacity, 50);

    let catalog = h.gateway().catalog();
    assert!(catalog.is_scheduled("Atlas", "9am-12pm").await.unwrap());
    assert!(catalog.is_scheduled("Atlas", "6pm-9pm").await.unwrap());
    assert!(!catalog.is_scheduled("Atlas", "12pm-3pm").await.unwrap());
}

/// Each function checks its argument count.
#[tokio::test]
async fn wrong_argument_counts_are_rejected() {
    let h = Harness::new();

    for (function, args, expected) in [
        ("upsertShow", vec!["Atlas"], 5),
        ("lookupShowByName", vec![], 1),
        ("reserveSeats", vec!["alice", "Atlas", "6pm-9pm"], 4),
        ("lookupReservationByTimeSlot", vec!["a", "b"], 1),
        ("lookupReservationByRequester", vec![], 1),
        ("seedShows", vec!["x"], 0),
        ("initializeQuota", vec![], 1),
        ("lookupQuotaPool", vec!["x"], 0),
    ] {
        let result = call(&h, function, &args).await;
        assert_eq!(
            result,
            Err(BookingError::Validation(format!(
                "Incorrect number of arguments. Expecting {expected}"
            ))),
            "{function}"
        );
    }
    assert!(h.ledger.is_empty());
}

#[tokio::test]
async fn unknown_function_is_rejected() {
    let h = Harness::new();

    let result = call(&h, "cancelReservation", &["alice"]).await;

    assert_eq!(
        result,
        Err(BookingError::Validation(
            "Received unknown function invocation".to_string()
        ))
    );
}

/// Malformed numbers and flags never reach the services.
#[tokio::test]
async fn unparsable_arguments_are_validation_errors() {
    let h = Harness::new();

    for args in [
        ["Atlas", "6pm-9pm", "many", "3", "false"],
        ["Atlas", "6pm-9pm", "100", "-1", "false"],
        ["Atlas", "6pm-9pm", "100", "3", "maybe"],
        ["", "6pm-9pm", "100", "3", "false"],
    ] {
        let result = call(&h, "upsertShow", &args).await;
        assert!(matches!(result, Err(BookingError::Validation(_))), "{args:?}");
    }
    for seats in ["0", "-2", "two"] {
        let result = call(&h, "reserveSeats", &["alice", "Atlas", "6pm-9pm", seats]).await;
        assert!(matches!(result, Err(BookingError::Validation(_))), "{seats}");
    }
    assert!(h.ledger.is_empty());
}

/// A show stored with more remaining than total seats is accepted as given.
#[tokio::test]
async fn remaining_above_total_is_stored_as_given() {
    let h = Harness::new();

    call(&h, "upsertShow", &["Atlas", "6pm-9pm", "10", "20", "false"])
        .await
        .unwrap();

    assert_eq!(h.stored_show("Atlas").unwrap().remaining_capacity, 20);
}

/// The status line of each reservation branch.
#[tokio::test]
async fn reserve_seats_returns_status_lines() {
    let h = Harness::new();
    call(&h, "upsertShow", &["Atlas", "6pm-9pm", "100", "3", "false"])
        .await
        .unwrap();

    let reserve = |requester: &'static str, seats: &'static str| {
        let gateway = h.gateway().clone();
        async move {
            gateway
                .invoke("reserveSeats", &[requester, "Atlas", "6pm-9pm", seats])
                .await
                .unwrap()
        }
    };

    assert_eq!(
        reserve("alice", "5").await,
        "Only limited seats are available. Remaining seats: 2"
    );
    // Every attempt draws an id, so the refused request above consumed "1".
    assert_eq!(
        reserve("alice", "2").await,
        "Show booked successfully. Booking ID: alice_2"
    );
    assert_eq!(
        reserve("bob", "1").await,
        "Selected time slot for Atlas is housefull already."
    );
    assert_eq!(
        reserve("carol", "1").await,
        "Requested show is not available for booking."
    );
}

/// Reservation lookups by slot and requester, and their NotFound cases.
#[tokio::test]
async fn reservation_lookups() {
    let h = Harness::new();
    h.list("Atlas", "6pm-9pm", 100, 10).await;
    h.list("Borealis", "9am-12pm", 100, 10).await;
    call(&h, "reserveSeats", &["alice", "Atlas", "6pm-9pm", "2"])
        .await
        .unwrap();
    call(&h, "reserveSeats", &["bob", "Borealis", "9am-12pm", "1"])
        .await
        .unwrap();

    let by_slot: Reservation = serde_json::from_str(
        &call(&h, "lookupReservationByTimeSlot", &["6pm-9pm"])
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(by_slot.requester_id, "alice");
    assert_eq!(by_slot.seats.len(), 2);

    let by_requester: Value = serde_json::from_str(
        &call(&h, "lookupReservationByRequester", &["bob"])
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(by_requester["showName"], "Borealis");
    assert_eq!(by_requester["seats"][0]["seatNumber"], "0");
    assert_eq!(by_requester["seats"][0]["bonusEligible"], false);

    assert!(matches!(
        call(&h, "lookupReservationByTimeSlot", &["12pm-3pm"]).await,
        Err(BookingError::NotFound { .. })
    ));
    assert!(matches!(
        call(&h, "lookupReservationByRequester", &["carol"]).await,
        Err(BookingError::NotFound { .. })
    ));
    assert_eq!(
        call(&h, "lookupShowByName", &["Nowhere"]).await,
        Err(BookingError::NotFound {
            entity: "show",
            key: "Nowhere".to_string()
        })
    );
}

/// Seeding keeps only the last slot per show name retrievable.
#[tokio::test]
async fn seed_shows_installs_demo_inventory() {
    let h = Harness::new();

    let status = call(&h, "seedShows", &[]).await.unwrap();
    assert_eq!(status, "Seeded 6 show records");
    assert_eq!(h.ledger.keys_of_type("show").len(), 3);
    assert_eq!(h.ledger.keys_of_type("show~slot").len(), 6);

    let grudge = h.stored_show("The Grudge").unwrap();
    assert_eq!(grudge.time_slot, "6pm-9pm");
    assert_eq!(grudge.remaining_capacity, 3);
    let godfather = h.stored_show("The Godfather").unwrap();
    assert_eq!(godfather.time_slot, "12pm-3pm");
    assert!(!godfather.sold_out);

    assert!(
        h.gateway()
            .catalog()
            .is_scheduled("The Godfather", "9am-12pm")
            .await
            .unwrap()
    );
    assert_eq!(
        call(&h, "reserveSeats", &["alice", "The Grudge", "9am-12pm", "1"])
            .await
            .unwrap(),
        "Requested show is not available for booking."
    );
}

/// Quota administration through the gateway.
#[tokio::test]
async fn quota_functions() {
    let h = Harness::new();

    assert!(matches!(
        call(&h, "lookupQuotaPool", &[]).await,
        Err(BookingError::NotFound { .. })
    ));
    assert!(matches!(
        call(&h, "initializeQuota", &["01/02/2025"]).await,
        Err(BookingError::Validation(_))
    ));

    let initialized: Value =
        serde_json::from_str(&call(&h, "initializeQuota", &["today"]).await.unwrap()).unwrap();
    assert_eq!(
        initialized,
        serde_json::json!({ "date": "2025-01-01", "remainingQuota": 200 })
    );

    let rolled: Value = serde_json::from_str(
        &call(&h, "rolloverQuota", &["2025-01-03"]).await.unwrap(),
    )
    .unwrap();
    assert_eq!(rolled["date"], "2025-01-03");

    let current: Value =
        serde_json::from_str(&call(&h, "lookupQuotaPool", &[]).await.unwrap()).unwrap();
    assert_eq!(current, rolled);
}
