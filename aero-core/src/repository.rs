use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::{Booking, BookingQuery, Flight, Passenger, Seat, Ticket};

/// Source of transactions. Every read and write of the booking core goes
/// through a [`StoreTx`] obtained here.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>>;
}

/// One unit of work. Dropping a transaction without calling
/// [`StoreTx::commit`] discards every change made through it.
#[async_trait]
pub trait StoreTx: Send {
    async fn get_flight(&mut self, id: Uuid) -> CoreResult<Option<Flight>>;

    async fn get_seat(&mut self, id: Uuid) -> CoreResult<Option<Seat>>;

    async fn find_seat_by_number(
        &mut self,
        flight_id: Uuid,
        seat_number: &str,
    ) -> CoreResult<Option<Seat>>;

    /// First available seat of the flight by cabin position, locked for this transaction.
    async fn first_available_seat(&mut self, flight_id: Uuid) -> CoreResult<Option<Seat>>;

    async fn list_seats(&mut self, flight_id: Uuid, available_only: bool) -> CoreResult<Vec<Seat>>;

    async fn insert_seat(&mut self, seat: &Seat) -> CoreResult<()>;

    /// Conditionally flips `is_available` from true to false.
    /// Returns `false` when the seat was already taken (or does not exist).
    async fn claim_seat(&mut self, seat_id: Uuid) -> CoreResult<bool>;

    /// Sets `is_available` back to true. Returns `false` when the seat does not exist.
    async fn free_seat(&mut self, seat_id: Uuid) -> CoreResult<bool>;

    async fn insert_booking(&mut self, booking: &Booking) -> CoreResult<()>;

    async fn get_booking(&mut self, id: Uuid) -> CoreResult<Option<Booking>>;

    async fn update_booking(&mut self, booking: &Booking) -> CoreResult<()>;

    async fn delete_booking(&mut self, id: Uuid) -> CoreResult<()>;

    /// Matching bookings after `skip`/`limit`, plus the total match count.
    async fn list_bookings(
        &mut self,
        query: &BookingQuery,
        limit: u64,
    ) -> CoreResult<(Vec<Booking>, u64)>;

    async fn insert_passenger(&mut self, passenger: &Passenger) -> CoreResult<()>;

    async fn get_passenger(&mut self, id: Uuid) -> CoreResult<Option<Passenger>>;

    async fn update_passenger(&mut self, passenger: &Passenger) -> CoreResult<()>;

    async fn delete_passenger(&mut self, id: Uuid) -> CoreResult<()>;

    async fn passengers_for_booking(&mut self, booking_id: Uuid) -> CoreResult<Vec<Passenger>>;

    async fn insert_ticket(&mut self, ticket: &Ticket) -> CoreResult<()>;

    async fn get_ticket(&mut self, id: Uuid) -> CoreResult<Option<Ticket>>;

    async fn set_ticket_seat(&mut self, ticket_id: Uuid, seat_id: Uuid) -> CoreResult<()>;

    async fn delete_ticket(&mut self, id: Uuid) -> CoreResult<()>;

    async fn tickets_for_passenger(&mut self, passenger_id: Uuid) -> CoreResult<Vec<Ticket>>;

    async fn commit(self: Box<Self>) -> CoreResult<()>;

    async fn rollback(self: Box<Self>) -> CoreResult<()>;
}
