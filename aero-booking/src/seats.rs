use aero_core::{BookingError, CoreResult, Entity, Seat, StoreTx};
use tracing::{info, warn};
use uuid::Uuid;

/// Seat inventory and allocation for a flight.
///
/// Every method runs inside the caller's transaction and never commits; a
/// failure later in the same transaction rolls the availability flag back.
pub struct SeatAllocator;

impl SeatAllocator {
    /// Pick the first free seat of the flight by cabin position.
    pub async fn find_available_seat(tx: &mut dyn StoreTx, flight_id: Uuid) -> CoreResult<Seat> {
        match tx.first_available_seat(flight_id).await? {
            Some(seat) => {
                info!("Found available seat {} on flight {}", seat.seat_number, flight_id);
                Ok(seat)
            }
            None => {
                warn!("No available seats found for flight {}", flight_id);
                Err(BookingError::NoAvailableSeats { flight_id })
            }
        }
    }

    /// Take a seat out of the available pool.
    ///
    /// The flip is a conditional update: if another writer got there first the
    /// claim affects nothing and the seat is reported as not available.
    pub async fn reserve(tx: &mut dyn StoreTx, seat_id: Uuid) -> CoreResult<Seat> {
        let mut seat = tx
            .get_seat(seat_id)
            .await?
            .ok_or_else(|| BookingError::not_found(Entity::Seat, seat_id))?;

        if !seat.is_available || !tx.claim_seat(seat_id).await? {
            warn!("Seat {} is not available", seat.seat_number);
            return Err(BookingError::SeatNotAvailable {
                seat_id,
                seat_number: seat.seat_number,
            });
        }

        seat.is_available = false;
        Ok(seat)
    }

    /// Return a seat to the pool. Releasing a free seat is a no-op.
    pub async fn release(tx: &mut dyn StoreTx, seat_id: Uuid) -> CoreResult<()> {
        if !tx.free_seat(seat_id).await? {
            warn!("Seat {} not found while releasing, skipping", seat_id);
        }
        Ok(())
    }

    /// Add a seat to a flight's roster. New seats start available.
    pub async fn add_seat(
        tx: &mut dyn StoreTx,
        flight_id: Uuid,
        seat_number: &str,
    ) -> CoreResult<Seat> {
        let seat_number = seat_number.trim();
        Seat::validate_number(seat_number)?;

        if tx.get_flight(flight_id).await?.is_none() {
            warn!("Flight not found with ID: {}", flight_id);
            return Err(BookingError::not_found(Entity::Flight, flight_id));
        }

        if tx.find_seat_by_number(flight_id, seat_number).await?.is_some() {
            warn!("Seat {} already exists for flight {}", seat_number, flight_id);
            return Err(BookingError::DuplicateSeat {
                flight_id,
                seat_number: seat_number.to_string(),
            });
        }

        let seat = Seat::new(flight_id, seat_number);
        tx.insert_seat(&seat).await?;
        info!("Created seat {} ({}) on flight {}", seat.seat_number, seat.id, flight_id);
        Ok(seat)
    }

    pub async fn seats_for_flight(
        tx: &mut dyn StoreTx,
        flight_id: Uuid,
        available_only: bool,
    ) -> CoreResult<Vec<Seat>> {
        if tx.get_flight(flight_id).await?.is_none() {
            return Err(BookingError::not_found(Entity::Flight, flight_id));
        }
        tx.list_seats(flight_id, available_only).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{flight, store_with_flight};
    use aero_core::{BookingStore, ErrorKind, InMemoryBookingStore};

    #[tokio::test]
    async fn test_reserve_and_release_lifecycle() {
        let (store, _flight, seats) = store_with_flight(&["1A", "1B"]).await;
        let mut tx = store.begin().await.unwrap();

        // Reserve
        let seat = SeatAllocator::reserve(tx.as_mut(), seats[0].id).await.unwrap();
        assert!(!seat.is_available);

        // Second reservation of the same seat must fail
        let err = SeatAllocator::reserve(tx.as_mut(), seats[0].id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Release twice, second time is a no-op
        SeatAllocator::release(tx.as_mut(), seats[0].id).await.unwrap();
        SeatAllocator::release(tx.as_mut(), seats[0].id).await.unwrap();
        assert!(tx.get_seat(seats[0].id).await.unwrap().unwrap().is_available);
    }

    #[tokio::test]
    async fn test_reserve_unknown_seat() {
        let (store, _flight, _seats) = store_with_flight(&["1A"]).await;
        let mut tx = store.begin().await.unwrap();

        let err = SeatAllocator::reserve(tx.as_mut(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound { entity: Entity::Seat, .. }));
    }

    #[tokio::test]
    async fn test_find_available_seat_skips_taken() {
        let (store, flight, seats) = store_with_flight(&["1A", "1B", "2A"]).await;
        let mut tx = store.begin().await.unwrap();

        SeatAllocator::reserve(tx.as_mut(), seats[0].id).await.unwrap();
        let next = SeatAllocator::find_available_seat(tx.as_mut(), flight.id).await.unwrap();
        assert_eq!(next.seat_number, "1B");

        SeatAllocator::reserve(tx.as_mut(), seats[1].id).await.unwrap();
        SeatAllocator::reserve(tx.as_mut(), seats[2].id).await.unwrap();
        let err = SeatAllocator::find_available_seat(tx.as_mut(), flight.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoAvailableSeats);
    }

    #[tokio::test]
    async fn test_add_seat_rejects_duplicates() {
        let (store, flight, _seats) = store_with_flight(&["1A"]).await;
        let mut tx = store.begin().await.unwrap();

        let seat = SeatAllocator::add_seat(tx.as_mut(), flight.id, "3C").await.unwrap();
        assert!(seat.is_available);

        let err = SeatAllocator::add_seat(tx.as_mut(), flight.id, "1A").await.unwrap_err();
        assert!(matches!(err, BookingError::DuplicateSeat { .. }));

        let err = SeatAllocator::add_seat(tx.as_mut(), Uuid::new_v4(), "1A").await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound { entity: Entity::Flight, .. }));
    }

    #[tokio::test]
    async fn test_add_seat_rejects_malformed_numbers() {
        let (store, flight, _seats) = store_with_flight(&["1A"]).await;
        let mut tx = store.begin().await.unwrap();

        for number in ["   ", "ROW12SEATC"] {
            let err = SeatAllocator::add_seat(tx.as_mut(), flight.id, number).await.unwrap_err();
            assert!(matches!(err, BookingError::Validation(_)));
        }
        let seats = SeatAllocator::seats_for_flight(tx.as_mut(), flight.id, false).await.unwrap();
        assert_eq!(seats.len(), 1);
    }

    #[tokio::test]
    async fn test_seats_for_flight_filters_available() {
        let store = InMemoryBookingStore::new();
        let flight = flight();
        let seats = store.seed_flight(flight.clone(), &["2A", "1A", "1B"]).await;
        let mut tx = store.begin().await.unwrap();

        SeatAllocator::reserve(tx.as_mut(), seats[1].id).await.unwrap();

        let all = SeatAllocator::seats_for_flight(tx.as_mut(), flight.id, false).await.unwrap();
        let numbers: Vec<&str> = all.iter().map(|s| s.seat_number.as_str()).collect();
        assert_eq!(numbers, vec!["1A", "1B", "2A"]);

        let free = SeatAllocator::seats_for_flight(tx.as_mut(), flight.id, true).await.unwrap();
        assert_eq!(free.len(), 2);
    }
}
