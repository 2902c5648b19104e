use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{BookingError, CoreResult, Entity};
use crate::models::{Booking, BookingQuery, Flight, Passenger, Seat, Ticket};
use crate::repository::{BookingStore, StoreTx};

#[derive(Debug, Clone, Default)]
struct Tables {
    flights: HashMap<Uuid, Flight>,
    seats: HashMap<Uuid, Seat>,
    bookings: HashMap<Uuid, Booking>,
    // Insertion order is the order passengers were registered in.
    passengers: Vec<Passenger>,
    tickets: HashMap<Uuid, Ticket>,
}

/// In-memory store with serializable transactions.
///
/// One transaction runs at a time; it works on the live tables and keeps a
/// snapshot that is written back on rollback or drop. Foreign keys and unique
/// constraints mirror the PostgreSQL schema so integrity failures surface the
/// same way.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flight with a roster of available seats.
    pub async fn seed_flight(&self, flight: Flight, seat_numbers: &[&str]) -> Vec<Seat> {
        let mut tables = self.tables.lock().await;
        let flight_id = flight.id;
        tables.flights.insert(flight_id, flight);

        let mut seats = Vec::with_capacity(seat_numbers.len());
        for number in seat_numbers {
            let seat = Seat::new(flight_id, *number);
            tables.seats.insert(seat.id, seat.clone());
            seats.push(seat);
        }
        seats
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        self.tables.lock().await.bookings.values().cloned().collect()
    }

    pub async fn passengers(&self) -> Vec<Passenger> {
        self.tables.lock().await.passengers.clone()
    }

    pub async fn tickets(&self) -> Vec<Ticket> {
        self.tables.lock().await.tickets.values().cloned().collect()
    }

    pub async fn seat(&self, seat_id: Uuid) -> Option<Seat> {
        self.tables.lock().await.seats.get(&seat_id).cloned()
    }

    /// True when every seat is unavailable exactly when one ticket holds it.
    pub async fn seat_invariant_holds(&self) -> bool {
        let tables = self.tables.lock().await;
        tables.seats.values().all(|seat| {
            let holders = tables
                .tickets
                .values()
                .filter(|t| t.seat_id == seat.id)
                .count();
            match holders {
                0 => seat.is_available,
                1 => !seat.is_available,
                _ => false,
            }
        })
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    snapshot: Option<Tables>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            tracing::debug!("in-memory transaction discarded, restoring snapshot");
            *self.guard = snapshot;
        }
    }
}

fn sorted_by_position(mut seats: Vec<Seat>) -> Vec<Seat> {
    seats.sort_by_key(|s| s.position());
    seats
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn get_flight(&mut self, id: Uuid) -> CoreResult<Option<Flight>> {
        Ok(self.guard.flights.get(&id).cloned())
    }

    async fn get_seat(&mut self, id: Uuid) -> CoreResult<Option<Seat>> {
        Ok(self.guard.seats.get(&id).cloned())
    }

    async fn find_seat_by_number(
        &mut self,
        flight_id: Uuid,
        seat_number: &str,
    ) -> CoreResult<Option<Seat>> {
        Ok(self
            .guard
            .seats
            .values()
            .find(|s| s.flight_id == flight_id && s.seat_number == seat_number)
            .cloned())
    }

    async fn first_available_seat(&mut self, flight_id: Uuid) -> CoreResult<Option<Seat>> {
        Ok(self
            .guard
            .seats
            .values()
            .filter(|s| s.flight_id == flight_id && s.is_available)
            .min_by_key(|s| s.position())
            .cloned())
    }

    async fn list_seats(&mut self, flight_id: Uuid, available_only: bool) -> CoreResult<Vec<Seat>> {
        let seats = self
            .guard
            .seats
            .values()
            .filter(|s| s.flight_id == flight_id && (!available_only || s.is_available))
            .cloned()
            .collect();
        Ok(sorted_by_position(seats))
    }

    async fn insert_seat(&mut self, seat: &Seat) -> CoreResult<()> {
        if !self.guard.flights.contains_key(&seat.flight_id) {
            return Err(BookingError::integrity(
                Entity::Seat,
                format!("flight {} does not exist", seat.flight_id),
            ));
        }
        let duplicate = self
            .guard
            .seats
            .values()
            .any(|s| s.flight_id == seat.flight_id && s.seat_number == seat.seat_number);
        if duplicate || self.guard.seats.contains_key(&seat.id) {
            return Err(BookingError::integrity(
                Entity::Seat,
                format!("duplicate seat {} on flight {}", seat.seat_number, seat.flight_id),
            ));
        }
        self.guard.seats.insert(seat.id, seat.clone());
        Ok(())
    }

    async fn claim_seat(&mut self, seat_id: Uuid) -> CoreResult<bool> {
        match self.guard.seats.get_mut(&seat_id) {
            Some(seat) if seat.is_available => {
                seat.is_available = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn free_seat(&mut self, seat_id: Uuid) -> CoreResult<bool> {
        match self.guard.seats.get_mut(&seat_id) {
            Some(seat) => {
                seat.is_available = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_booking(&mut self, booking: &Booking) -> CoreResult<()> {
        let duplicate = self
            .guard
            .bookings
            .values()
            .any(|b| b.id == booking.id || b.booking_number == booking.booking_number);
        if duplicate {
            return Err(BookingError::integrity(
                Entity::Booking,
                format!("duplicate booking number {}", booking.booking_number),
            ));
        }
        self.guard.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&mut self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(self.guard.bookings.get(&id).cloned())
    }

    async fn update_booking(&mut self, booking: &Booking) -> CoreResult<()> {
        match self.guard.bookings.get_mut(&booking.id) {
            Some(stored) => {
                *stored = booking.clone();
                Ok(())
            }
            None => Err(BookingError::not_found(Entity::Booking, booking.id)),
        }
    }

    async fn delete_booking(&mut self, id: Uuid) -> CoreResult<()> {
        if self.guard.passengers.iter().any(|p| p.booking_id == id) {
            return Err(BookingError::integrity(
                Entity::Booking,
                format!("booking {} is still referenced by passengers", id),
            ));
        }
        self.guard
            .bookings
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BookingError::not_found(Entity::Booking, id))
    }

    async fn list_bookings(
        &mut self,
        query: &BookingQuery,
        limit: u64,
    ) -> CoreResult<(Vec<Booking>, u64)> {
        let mut matching: Vec<Booking> = self
            .guard
            .bookings
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        matching.sort_by_key(|b| (Reverse(b.booking_date), b.id));

        let count = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.skip as usize)
            .take(limit as usize)
            .collect();
        Ok((page, count))
    }

    async fn insert_passenger(&mut self, passenger: &Passenger) -> CoreResult<()> {
        if !self.guard.bookings.contains_key(&passenger.booking_id) {
            return Err(BookingError::integrity(
                Entity::Passenger,
                format!("booking {} does not exist", passenger.booking_id),
            ));
        }
        if self.guard.passengers.iter().any(|p| p.id == passenger.id) {
            return Err(BookingError::integrity(
                Entity::Passenger,
                format!("duplicate passenger id {}", passenger.id),
            ));
        }
        self.guard.passengers.push(passenger.clone());
        Ok(())
    }

    async fn get_passenger(&mut self, id: Uuid) -> CoreResult<Option<Passenger>> {
        Ok(self.guard.passengers.iter().find(|p| p.id == id).cloned())
    }

    async fn update_passenger(&mut self, passenger: &Passenger) -> CoreResult<()> {
        match self.guard.passengers.iter_mut().find(|p| p.id == passenger.id) {
            Some(stored) => {
                *stored = passenger.clone();
                Ok(())
            }
            None => Err(BookingError::not_found(Entity::Passenger, passenger.id)),
        }
    }

    async fn delete_passenger(&mut self, id: Uuid) -> CoreResult<()> {
        if self.guard.tickets.values().any(|t| t.passenger_id == id) {
            return Err(BookingError::integrity(
                Entity::Passenger,
                format!("passenger {} still holds tickets", id),
            ));
        }
        let before = self.guard.passengers.len();
        self.guard.passengers.retain(|p| p.id != id);
        if self.guard.passengers.len() == before {
            return Err(BookingError::not_found(Entity::Passenger, id));
        }
        Ok(())
    }

    async fn passengers_for_booking(&mut self, booking_id: Uuid) -> CoreResult<Vec<Passenger>> {
        Ok(self
            .guard
            .passengers
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> CoreResult<()> {
        let tables = &*self.guard;
        if !tables.passengers.iter().any(|p| p.id == ticket.passenger_id) {
            return Err(BookingError::integrity(
                Entity::Ticket,
                format!("passenger {} does not exist", ticket.passenger_id),
            ));
        }
        if !tables.flights.contains_key(&ticket.flight_id) {
            return Err(BookingError::integrity(
                Entity::Ticket,
                format!("flight {} does not exist", ticket.flight_id),
            ));
        }
        if !tables.seats.contains_key(&ticket.seat_id) {
            return Err(BookingError::integrity(
                Entity::Ticket,
                format!("seat {} does not exist", ticket.seat_id),
            ));
        }
        let clash = tables.tickets.values().any(|t| {
            t.id == ticket.id || t.ticket_number == ticket.ticket_number || t.seat_id == ticket.seat_id
        });
        if clash {
            return Err(BookingError::integrity(
                Entity::Ticket,
                format!("ticket {} violates a unique constraint", ticket.ticket_number),
            ));
        }
        self.guard.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn get_ticket(&mut self, id: Uuid) -> CoreResult<Option<Ticket>> {
        Ok(self.guard.tickets.get(&id).cloned())
    }

    async fn set_ticket_seat(&mut self, ticket_id: Uuid, seat_id: Uuid) -> CoreResult<()> {
        if !self.guard.seats.contains_key(&seat_id) {
            return Err(BookingError::integrity(
                Entity::Ticket,
                format!("seat {} does not exist", seat_id),
            ));
        }
        if self
            .guard
            .tickets
            .values()
            .any(|t| t.id != ticket_id && t.seat_id == seat_id)
        {
            return Err(BookingError::integrity(
                Entity::Ticket,
                format!("seat {} is already bound to another ticket", seat_id),
            ));
        }
        match self.guard.tickets.get_mut(&ticket_id) {
            Some(ticket) => {
                ticket.seat_id = seat_id;
                Ok(())
            }
            None => Err(BookingError::not_found(Entity::Ticket, ticket_id)),
        }
    }

    async fn delete_ticket(&mut self, id: Uuid) -> CoreResult<()> {
        self.guard
            .tickets
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BookingError::not_found(Entity::Ticket, id))
    }

    async fn tickets_for_passenger(&mut self, passenger_id: Uuid) -> CoreResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .guard
            .tickets
            .values()
            .filter(|t| t.passenger_id == passenger_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| a.ticket_number.cmp(&b.ticket_number));
        Ok(tickets)
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        let mut tx = self;
        tx.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> CoreResult<()> {
        // Drop writes the snapshot back.
        drop(self);
        Ok(())
    }
}
