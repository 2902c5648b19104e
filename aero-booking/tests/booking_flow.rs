use aero_booking::{AddPassenger, BookingOrchestrator, NewBooking};
use aero_core::{
    Actor, BookingError, BookingQuery, BookingRules, BookingStatus, ErrorKind, Flight,
    InMemoryBookingStore, PassengerInfo, PassengerPatch, Seat, ViewFilter,
};
use aero_shared::Masked;
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

struct Fixture {
    store: InMemoryBookingStore,
    orchestrator: Arc<BookingOrchestrator>,
    flight: Flight,
    seats: Vec<Seat>,
}

async fn setup(seat_numbers: &[&str]) -> Fixture {
    let store = InMemoryBookingStore::new();
    let departure = Utc::now() + Duration::days(7);
    let flight = Flight {
        id: Uuid::new_v4(),
        flight_number: "AE318".to_string(),
        departure_code: "AMS".to_string(),
        arrival_code: "NRT".to_string(),
        departure_time: departure,
        arrival_time: departure + Duration::hours(11),
        base_price: 80000,
    };
    let seats = store.seed_flight(flight.clone(), seat_numbers).await;
    let orchestrator = Arc::new(BookingOrchestrator::new(
        Arc::new(store.clone()),
        BookingRules::default(),
    ));
    Fixture {
        store,
        orchestrator,
        flight,
        seats,
    }
}

fn traveler(first_name: &str) -> PassengerInfo {
    PassengerInfo {
        first_name: first_name.to_string(),
        last_name: "Hamilton".to_string(),
        nationality: "US".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1986, 8, 17).unwrap(),
        passport_number: Some(Masked("X99887766".to_string())),
    }
}

fn request(user_id: Uuid, flight_id: Uuid, seat_ids: Vec<Option<Uuid>>) -> NewBooking {
    NewBooking {
        user_id,
        total_price: 120000,
        passengers: (0..seat_ids.len())
            .map(|i| traveler(&format!("Traveler{}", i)))
            .collect(),
        flight_id,
        seat_ids,
    }
}

#[tokio::test]
async fn test_failed_seat_leaves_nothing_behind() {
    let fx = setup(&["1A", "1B", "1C"]).await;
    let user = Uuid::new_v4();

    // Take 1B first
    fx.orchestrator
        .create_detailed_booking(request(user, fx.flight.id, vec![Some(fx.seats[1].id)]))
        .await
        .unwrap();

    let err = fx
        .orchestrator
        .create_detailed_booking(request(
            user,
            fx.flight.id,
            vec![Some(fx.seats[0].id), Some(fx.seats[1].id)],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::SeatNotAvailable { .. }));
    assert_eq!(fx.store.bookings().await.len(), 1);
    assert_eq!(fx.store.passengers().await.len(), 1);
    assert_eq!(fx.store.tickets().await.len(), 1);
    assert!(fx.store.seat(fx.seats[0].id).await.unwrap().is_available);
    assert!(fx.store.seat_invariant_holds().await);
}

#[tokio::test]
async fn test_failure_at_last_passenger_rolls_back_everything() {
    let fx = setup(&["1A", "1B"]).await;
    let user = Uuid::new_v4();

    // Three passengers, two seats: the third auto-assign runs dry
    let err = fx
        .orchestrator
        .create_detailed_booking(request(user, fx.flight.id, vec![None, None, None]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoAvailableSeats);
    assert!(fx.store.bookings().await.is_empty());
    assert!(fx.store.passengers().await.is_empty());
    assert!(fx.store.tickets().await.is_empty());
    for seat in &fx.seats {
        assert!(fx.store.seat(seat.id).await.unwrap().is_available);
    }
}

#[tokio::test]
async fn test_concurrent_auto_assign_for_last_seat() {
    let fx = setup(&["1A", "1B"]).await;

    fx.orchestrator
        .create_detailed_booking(request(Uuid::new_v4(), fx.flight.id, vec![Some(fx.seats[1].id)]))
        .await
        .unwrap();

    let first = {
        let orch = fx.orchestrator.clone();
        let flight_id = fx.flight.id;
        tokio::spawn(async move {
            orch.create_detailed_booking(request(Uuid::new_v4(), flight_id, vec![None]))
                .await
        })
    };
    let second = {
        let orch = fx.orchestrator.clone();
        let flight_id = fx.flight.id;
        tokio::spawn(async move {
            orch.create_detailed_booking(request(Uuid::new_v4(), flight_id, vec![None]))
                .await
        })
    };

    let results = vec![first.await.unwrap(), second.await.unwrap()];
    let won: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let lost: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(won.len(), 1);
    assert_eq!(won[0].passengers[0].tickets[0].seat_number, "1A");
    assert_eq!(lost.len(), 1);
    assert_eq!(lost[0].kind(), ErrorKind::NoAvailableSeats);
    assert!(fx.store.seat_invariant_holds().await);
}

#[tokio::test]
async fn test_cancel_is_terminal_and_idempotent() {
    let fx = setup(&["1A"]).await;
    let owner = Actor::user(Uuid::new_v4());
    let detail = fx
        .orchestrator
        .create_detailed_booking(request(owner.user_id, fx.flight.id, vec![None]))
        .await
        .unwrap();
    let id = detail.booking.id;

    let confirmed = fx
        .orchestrator
        .update_status(&owner, id, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    fx.orchestrator
        .update_status(&owner, id, BookingStatus::Cancelled)
        .await
        .unwrap();
    let again = fx
        .orchestrator
        .update_status(&owner, id, BookingStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(again.status, BookingStatus::Cancelled);

    let err = fx
        .orchestrator
        .update_status(&owner, id, BookingStatus::Confirmed)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);
}

#[tokio::test]
async fn test_soft_delete_hides_from_default_listing() {
    let fx = setup(&["1A", "1B"]).await;
    let owner = Actor::user(Uuid::new_v4());
    let kept = fx
        .orchestrator
        .create_detailed_booking(request(owner.user_id, fx.flight.id, vec![None]))
        .await
        .unwrap();
    let removed = fx
        .orchestrator
        .create_detailed_booking(request(owner.user_id, fx.flight.id, vec![None]))
        .await
        .unwrap();

    let deleted = fx
        .orchestrator
        .soft_delete(&owner, removed.booking.id)
        .await
        .unwrap();
    assert!(deleted.deleted);
    assert!(deleted.deleted_at.is_some());

    let active = fx
        .orchestrator
        .list_bookings(&owner, BookingQuery::default())
        .await
        .unwrap();
    assert_eq!(active.count, 1);
    assert_eq!(active.data[0].id, kept.booking.id);

    let trash = BookingQuery {
        view: ViewFilter::Deleted,
        ..Default::default()
    };
    let trash = fx.orchestrator.list_bookings(&owner, trash).await.unwrap();
    assert_eq!(trash.data[0].id, removed.booking.id);

    // Still addressable by ID
    let detail = fx
        .orchestrator
        .get_booking_detail(&owner, removed.booking.id)
        .await
        .unwrap();
    assert!(detail.booking.deleted);

    let restored = fx
        .orchestrator
        .restore(&owner, removed.booking.id)
        .await
        .unwrap();
    assert!(!restored.deleted);
    assert!(restored.deleted_at.is_none());
}

#[tokio::test]
async fn test_hard_delete_frees_seats() {
    let fx = setup(&["1A", "1B"]).await;
    let admin = Actor::admin(Uuid::new_v4());
    let detail = fx
        .orchestrator
        .create_detailed_booking(request(Uuid::new_v4(), fx.flight.id, vec![None, None]))
        .await
        .unwrap();

    fx.orchestrator
        .hard_delete(&admin, detail.booking.id)
        .await
        .unwrap();

    assert!(fx.store.bookings().await.is_empty());
    assert!(fx.store.passengers().await.is_empty());
    assert!(fx.store.tickets().await.is_empty());
    assert!(fx.store.seat_invariant_holds().await);

    let err = fx
        .orchestrator
        .get_booking(&admin, detail.booking.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_reassign_and_revoke_keep_counts_aligned() {
    let fx = setup(&["1A", "1B", "1C"]).await;
    let owner = Actor::user(Uuid::new_v4());
    let admin = Actor::admin(Uuid::new_v4());
    let detail = fx
        .orchestrator
        .create_detailed_booking(request(owner.user_id, fx.flight.id, vec![None, None]))
        .await
        .unwrap();
    let ticket_id = detail.passengers[0].tickets[0].ticket.id;

    let moved = fx
        .orchestrator
        .reassign_seat(&admin, ticket_id, fx.seats[2].id)
        .await
        .unwrap();
    assert_eq!(moved.seat_number, "1C");
    assert!(fx.store.seat(fx.seats[0].id).await.unwrap().is_available);

    fx.orchestrator.revoke_ticket(&admin, ticket_id).await.unwrap();

    let after = fx
        .orchestrator
        .get_booking_detail(&owner, detail.booking.id)
        .await
        .unwrap();
    assert_eq!(after.passengers.len(), 1);
    assert_eq!(after.ticket_count(), 1);
    assert!(fx.store.seat_invariant_holds().await);
}

#[tokio::test]
async fn test_admin_adds_passenger_with_ticket() {
    let fx = setup(&["1A", "1B"]).await;
    let owner = Actor::user(Uuid::new_v4());
    let admin = Actor::admin(Uuid::new_v4());
    let detail = fx
        .orchestrator
        .create_detailed_booking(request(owner.user_id, fx.flight.id, vec![None]))
        .await
        .unwrap();

    let addition = AddPassenger {
        passenger: traveler("Eliza"),
        flight_id: fx.flight.id,
        seat_id: None,
    };
    let err = fx
        .orchestrator
        .add_passenger(&owner, detail.booking.id, addition.clone())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnauthorizedAccess);

    let updated = fx
        .orchestrator
        .add_passenger(&admin, detail.booking.id, addition.clone())
        .await
        .unwrap();
    assert_eq!(updated.passengers.len(), 2);
    assert_eq!(updated.ticket_count(), 2);
    assert_eq!(updated.passengers[1].tickets[0].seat_number, "1B");

    fx.orchestrator
        .update_status(&owner, detail.booking.id, BookingStatus::Cancelled)
        .await
        .unwrap();
    let err = fx
        .orchestrator
        .add_passenger(&admin, detail.booking.id, addition)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[tokio::test]
async fn test_ticket_changes_need_admin_even_for_owner() {
    let fx = setup(&["1A", "1B"]).await;
    let owner = Actor::user(Uuid::new_v4());
    let detail = fx
        .orchestrator
        .create_detailed_booking(request(owner.user_id, fx.flight.id, vec![None]))
        .await
        .unwrap();
    let ticket_id = detail.passengers[0].tickets[0].ticket.id;

    let err = fx
        .orchestrator
        .reassign_seat(&owner, ticket_id, fx.seats[1].id)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::PrivilegeRequired { .. }));

    let err = fx
        .orchestrator
        .revoke_ticket(&owner, ticket_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnauthorizedAccess);

    assert_eq!(fx.store.tickets().await.len(), 1);
    assert_eq!(fx.store.passengers().await.len(), 1);
    assert!(!fx.store.seat(fx.seats[0].id).await.unwrap().is_available);
    assert!(fx.store.seat(fx.seats[1].id).await.unwrap().is_available);
}

#[tokio::test]
async fn test_added_passenger_must_fly_with_the_booking() {
    let fx = setup(&["1A", "1B"]).await;
    let admin = Actor::admin(Uuid::new_v4());
    let departure = Utc::now() + Duration::days(9);
    let other_flight = Flight {
        id: Uuid::new_v4(),
        flight_number: "AE319".to_string(),
        departure_code: "NRT".to_string(),
        arrival_code: "AMS".to_string(),
        departure_time: departure,
        arrival_time: departure + Duration::hours(12),
        base_price: 80000,
    };
    let other_seats = fx.store.seed_flight(other_flight.clone(), &["7A"]).await;
    let detail = fx
        .orchestrator
        .create_detailed_booking(request(Uuid::new_v4(), fx.flight.id, vec![None]))
        .await
        .unwrap();

    let err = fx
        .orchestrator
        .add_passenger(
            &admin,
            detail.booking.id,
            AddPassenger {
                passenger: traveler("Peggy"),
                flight_id: other_flight.id,
                seat_id: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert_eq!(fx.store.passengers().await.len(), 1);
    assert_eq!(fx.store.tickets().await.len(), 1);
    assert!(fx.store.seat(other_seats[0].id).await.unwrap().is_available);
}

#[tokio::test]
async fn test_added_passenger_respects_passenger_cap() {
    let fx = setup(&["1A", "1B", "1C"]).await;
    let rules = BookingRules {
        max_passengers_per_booking: 2,
        ..BookingRules::default()
    };
    let orchestrator = BookingOrchestrator::new(Arc::new(fx.store.clone()), rules);
    let admin = Actor::admin(Uuid::new_v4());
    let detail = orchestrator
        .create_detailed_booking(request(Uuid::new_v4(), fx.flight.id, vec![None]))
        .await
        .unwrap();
    let addition = AddPassenger {
        passenger: traveler("Ida"),
        flight_id: fx.flight.id,
        seat_id: None,
    };

    let updated = orchestrator
        .add_passenger(&admin, detail.booking.id, addition.clone())
        .await
        .unwrap();
    assert_eq!(updated.passengers.len(), 2);

    let err = orchestrator
        .add_passenger(&admin, detail.booking.id, addition)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert_eq!(fx.store.passengers().await.len(), 2);
    assert!(fx.store.seat(fx.seats[2].id).await.unwrap().is_available);
}

#[tokio::test]
async fn test_oversized_passenger_fields_are_rejected_before_writing() {
    let fx = setup(&["1A", "1B"]).await;
    let admin = Actor::admin(Uuid::new_v4());

    let mut oversized = request(Uuid::new_v4(), fx.flight.id, vec![None]);
    oversized.passengers[0].passport_number = Some(Masked("X".repeat(40)));
    let err = fx
        .orchestrator
        .create_detailed_booking(oversized)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert!(fx.store.bookings().await.is_empty());

    let detail = fx
        .orchestrator
        .create_detailed_booking(request(Uuid::new_v4(), fx.flight.id, vec![None]))
        .await
        .unwrap();
    let mut passenger = traveler("Grace");
    passenger.last_name = "H".repeat(101);
    let err = fx
        .orchestrator
        .add_passenger(
            &admin,
            detail.booking.id,
            AddPassenger {
                passenger,
                flight_id: fx.flight.id,
                seat_id: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert_eq!(fx.store.passengers().await.len(), 1);

    let patch = PassengerPatch {
        first_name: Some(String::new()),
        ..Default::default()
    };
    let err = fx
        .orchestrator
        .update_passenger(&admin, detail.passengers[0].passenger.id, patch)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[tokio::test]
async fn test_update_passenger_checks_owner() {
    let fx = setup(&["1A"]).await;
    let owner = Actor::user(Uuid::new_v4());
    let detail = fx
        .orchestrator
        .create_detailed_booking(request(owner.user_id, fx.flight.id, vec![None]))
        .await
        .unwrap();
    let passenger_id = detail.passengers[0].passenger.id;

    let patch = PassengerPatch {
        nationality: Some("CA".to_string()),
        ..Default::default()
    };
    let err = fx
        .orchestrator
        .update_passenger(&Actor::user(Uuid::new_v4()), passenger_id, patch.clone())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnauthorizedAccess);

    let updated = fx
        .orchestrator
        .update_passenger(&owner, passenger_id, patch)
        .await
        .unwrap();
    assert_eq!(updated.nationality, "CA");
    assert_eq!(updated.passport_number, Some(Masked("X99887766".to_string())));
}
