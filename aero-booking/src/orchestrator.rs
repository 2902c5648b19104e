use aero_core::{
    Actor, Booking, BookingDetail, BookingError, BookingPatch, BookingQuery, BookingRules,
    BookingStatus, BookingStore, CoreResult, Entity, Page, Passenger, PassengerDetail,
    PassengerInfo, PassengerPatch, Seat, StoreTx, TicketWithSeat,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::passengers::PassengerRegistrar;
use crate::seats::SeatAllocator;
use crate::status::BookingStatusMachine;
use crate::tickets::TicketIssuer;

/// Input for [`BookingOrchestrator::create_detailed_booking`].
///
/// `seat_ids[i]` is the seat for `passengers[i]`; `None` auto-assigns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub total_price: i64,
    pub passengers: Vec<PassengerInfo>,
    pub flight_id: Uuid,
    pub seat_ids: Vec<Option<Uuid>>,
}

/// A passenger added to an existing booking, with the ticket to issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPassenger {
    pub passenger: PassengerInfo,
    pub flight_id: Uuid,
    #[serde(default)]
    pub seat_id: Option<Uuid>,
}

/// Runs every booking operation as one store transaction: commit on success,
/// rollback on the first error.
pub struct BookingOrchestrator {
    store: Arc<dyn BookingStore>,
    rules: BookingRules,
}

impl BookingOrchestrator {
    pub fn new(store: Arc<dyn BookingStore>, rules: BookingRules) -> Self {
        Self { store, rules }
    }

    /// Create a booking with its passengers and one ticket per passenger.
    /// Nothing persists unless every step succeeds.
    pub async fn create_detailed_booking(&self, new: NewBooking) -> CoreResult<BookingDetail> {
        validate_new_booking(&self.rules, &new)?;

        let mut tx = self.store.begin().await?;
        let result = create_in_tx(tx.as_mut(), &self.rules.booking_number_prefix, new).await;
        let detail = finish(tx, result).await?;

        info!(
            "Created booking {} with {} passengers",
            detail.booking.booking_number,
            detail.passengers.len()
        );
        Ok(detail)
    }

    pub async fn get_booking(&self, actor: &Actor, booking_id: Uuid) -> CoreResult<Booking> {
        let mut tx = self.store.begin().await?;
        let result = load_accessible(tx.as_mut(), actor, booking_id).await;
        finish(tx, result).await
    }

    /// Soft-deleted bookings stay addressable here.
    pub async fn get_booking_detail(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> CoreResult<BookingDetail> {
        let mut tx = self.store.begin().await?;
        let result = detail_in_tx(tx.as_mut(), actor, booking_id).await;
        finish(tx, result).await
    }

    /// Regular users only ever see their own bookings; privileged actors may
    /// filter by owner or see everyone's.
    pub async fn list_bookings(
        &self,
        actor: &Actor,
        mut query: BookingQuery,
    ) -> CoreResult<Page<Booking>> {
        if !actor.is_superuser {
            query.user_id = Some(actor.user_id);
        }
        let limit = query
            .limit
            .unwrap_or(self.rules.max_page_size)
            .min(self.rules.max_page_size);

        let mut tx = self.store.begin().await?;
        let result = tx.list_bookings(&query, limit).await;
        let (data, count) = finish(tx, result).await?;

        debug!("Listed {} of {} bookings for {}", data.len(), count, actor.user_id);
        Ok(Page { data, count })
    }

    pub async fn update_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        patch: BookingPatch,
    ) -> CoreResult<Booking> {
        let mut tx = self.store.begin().await?;
        let result = update_in_tx(tx.as_mut(), actor, booking_id, patch).await;
        finish(tx, result).await
    }

    pub async fn update_status(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> CoreResult<Booking> {
        let mut tx = self.store.begin().await?;
        let result = status_in_tx(tx.as_mut(), actor, booking_id, new_status).await;
        finish(tx, result).await
    }

    pub async fn soft_delete(&self, actor: &Actor, booking_id: Uuid) -> CoreResult<Booking> {
        let mut tx = self.store.begin().await?;
        let result = soft_delete_in_tx(tx.as_mut(), actor, booking_id).await;
        finish(tx, result).await
    }

    /// Undo a soft delete. A booking that is not deleted comes back unchanged.
    pub async fn restore(&self, actor: &Actor, booking_id: Uuid) -> CoreResult<Booking> {
        let mut tx = self.store.begin().await?;
        let result = restore_in_tx(tx.as_mut(), actor, booking_id).await;
        finish(tx, result).await
    }

    /// Permanently remove a booking. Tickets are revoked (freeing their seats)
    /// and passengers removed in the same transaction.
    pub async fn hard_delete(&self, actor: &Actor, booking_id: Uuid) -> CoreResult<()> {
        require_admin(actor, "delete bookings permanently")?;

        let mut tx = self.store.begin().await?;
        let result = hard_delete_in_tx(tx.as_mut(), booking_id).await;
        finish(tx, result).await
    }

    /// Add a passenger and its ticket to an existing booking.
    pub async fn add_passenger(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        request: AddPassenger,
    ) -> CoreResult<BookingDetail> {
        require_admin(actor, "add passengers to a booking")?;
        request.passenger.validate().map_err(reject)?;

        let mut tx = self.store.begin().await?;
        let result = add_passenger_in_tx(
            tx.as_mut(),
            self.rules.max_passengers_per_booking,
            booking_id,
            request,
        )
        .await;
        finish(tx, result).await
    }

    pub async fn update_passenger(
        &self,
        actor: &Actor,
        passenger_id: Uuid,
        patch: PassengerPatch,
    ) -> CoreResult<Passenger> {
        let mut tx = self.store.begin().await?;
        let result = update_passenger_in_tx(tx.as_mut(), actor, passenger_id, patch).await;
        finish(tx, result).await
    }

    pub async fn reassign_seat(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        new_seat_id: Uuid,
    ) -> CoreResult<TicketWithSeat> {
        require_admin(actor, "move passengers between seats")?;

        let mut tx = self.store.begin().await?;
        let result = TicketIssuer::reassign_seat(tx.as_mut(), ticket_id, new_seat_id).await;
        finish(tx, result).await
    }

    /// Revoke a ticket. Its passenger goes with it so the booking keeps one
    /// ticket per passenger.
    pub async fn revoke_ticket(&self, actor: &Actor, ticket_id: Uuid) -> CoreResult<()> {
        require_admin(actor, "revoke tickets")?;

        let mut tx = self.store.begin().await?;
        let result = revoke_in_tx(tx.as_mut(), ticket_id).await;
        finish(tx, result).await
    }

    pub async fn add_seat(
        &self,
        actor: &Actor,
        flight_id: Uuid,
        seat_number: &str,
    ) -> CoreResult<Seat> {
        require_admin(actor, "manage seat inventory")?;

        let mut tx = self.store.begin().await?;
        let result = SeatAllocator::add_seat(tx.as_mut(), flight_id, seat_number).await;
        finish(tx, result).await
    }

    pub async fn list_seats(&self, flight_id: Uuid, available_only: bool) -> CoreResult<Vec<Seat>> {
        let mut tx = self.store.begin().await?;
        let result = SeatAllocator::seats_for_flight(tx.as_mut(), flight_id, available_only).await;
        finish(tx, result).await
    }
}

/// `UnauthorizedAccess` unless the actor owns the booking or is privileged.
pub fn verify_access(booking: &Booking, actor: &Actor) -> CoreResult<()> {
    if actor.can_access(booking.user_id) {
        return Ok(());
    }
    warn!(
        "User {} is not authorized to access booking {}",
        actor.user_id, booking.id
    );
    Err(BookingError::UnauthorizedAccess {
        booking_id: booking.id,
        user_id: actor.user_id,
    })
}

fn require_admin(actor: &Actor, action: &'static str) -> CoreResult<()> {
    if actor.is_superuser {
        return Ok(());
    }
    warn!("User {} tried to {} without privileges", actor.user_id, action);
    Err(BookingError::PrivilegeRequired {
        user_id: actor.user_id,
        action,
    })
}

fn invalid(message: impl Into<String>) -> BookingError {
    let message = message.into();
    warn!("Rejected booking request: {}", message);
    BookingError::Validation(message)
}

fn reject(e: BookingError) -> BookingError {
    warn!("Rejected booking request: {}", e);
    e
}

fn validate_new_booking(rules: &BookingRules, new: &NewBooking) -> CoreResult<()> {
    if new.passengers.is_empty() {
        return Err(invalid("a booking needs at least one passenger"));
    }
    if new.passengers.len() != new.seat_ids.len() {
        return Err(invalid(format!(
            "got {} passengers but {} seat ids",
            new.passengers.len(),
            new.seat_ids.len()
        )));
    }
    if new.passengers.len() > rules.max_passengers_per_booking {
        return Err(invalid(format!(
            "a booking can hold at most {} passengers",
            rules.max_passengers_per_booking
        )));
    }
    if new.total_price < 0 {
        return Err(invalid("total_price must not be negative"));
    }

    for info in &new.passengers {
        info.validate().map_err(reject)?;
    }

    let mut seen = HashSet::new();
    for seat_id in new.seat_ids.iter().flatten() {
        if !seen.insert(*seat_id) {
            return Err(invalid(format!("seat {} requested more than once", seat_id)));
        }
    }
    Ok(())
}

async fn create_in_tx(
    tx: &mut dyn StoreTx,
    number_prefix: &str,
    new: NewBooking,
) -> CoreResult<BookingDetail> {
    if tx.get_flight(new.flight_id).await?.is_none() {
        warn!("Flight not found with ID: {}", new.flight_id);
        return Err(BookingError::not_found(Entity::Flight, new.flight_id));
    }

    let booking = Booking::new(new.user_id, new.total_price, number_prefix);
    tx.insert_booking(&booking).await?;

    let mut registered = Vec::with_capacity(new.passengers.len());
    for info in new.passengers {
        registered.push(PassengerRegistrar::register(tx, booking.id, info).await?);
    }

    // Tickets go out only once every passenger row exists.
    let mut passengers = Vec::with_capacity(registered.len());
    for (passenger, seat_id) in registered.into_iter().zip(new.seat_ids) {
        let ticket = TicketIssuer::issue(tx, passenger.id, new.flight_id, seat_id).await?;
        passengers.push(PassengerDetail {
            passenger,
            tickets: vec![ticket],
        });
    }

    Ok(BookingDetail {
        booking,
        passengers,
    })
}

async fn load_booking(tx: &mut dyn StoreTx, booking_id: Uuid) -> CoreResult<Booking> {
    match tx.get_booking(booking_id).await? {
        Some(booking) => Ok(booking),
        None => {
            warn!("Booking not found with ID: {}", booking_id);
            Err(BookingError::not_found(Entity::Booking, booking_id))
        }
    }
}

async fn load_accessible(
    tx: &mut dyn StoreTx,
    actor: &Actor,
    booking_id: Uuid,
) -> CoreResult<Booking> {
    let booking = load_booking(tx, booking_id).await?;
    verify_access(&booking, actor)?;
    Ok(booking)
}

async fn build_detail(tx: &mut dyn StoreTx, booking: Booking) -> CoreResult<BookingDetail> {
    let mut passengers = Vec::new();
    for passenger in PassengerRegistrar::passengers_for_booking(tx, booking.id).await? {
        let tickets = TicketIssuer::tickets_for_passenger(tx, passenger.id).await?;
        passengers.push(PassengerDetail { passenger, tickets });
    }
    Ok(BookingDetail {
        booking,
        passengers,
    })
}

async fn detail_in_tx(
    tx: &mut dyn StoreTx,
    actor: &Actor,
    booking_id: Uuid,
) -> CoreResult<BookingDetail> {
    let booking = load_accessible(tx, actor, booking_id).await?;
    build_detail(tx, booking).await
}

async fn update_in_tx(
    tx: &mut dyn StoreTx,
    actor: &Actor,
    booking_id: Uuid,
    patch: BookingPatch,
) -> CoreResult<Booking> {
    let mut booking = load_accessible(tx, actor, booking_id).await?;
    if patch.is_empty() {
        return Ok(booking);
    }

    patch.apply(&mut booking)?;
    tx.update_booking(&booking).await?;
    info!("Updated booking {}", booking.booking_number);
    Ok(booking)
}

async fn status_in_tx(
    tx: &mut dyn StoreTx,
    actor: &Actor,
    booking_id: Uuid,
    new_status: BookingStatus,
) -> CoreResult<Booking> {
    let mut booking = load_accessible(tx, actor, booking_id).await?;
    let from = booking.status;

    if let Err(e) = BookingStatusMachine::transition(&mut booking, new_status) {
        warn!("{}", e);
        return Err(e);
    }
    tx.update_booking(&booking).await?;

    info!(
        "Booking {} status changed from {} to {}",
        booking.booking_number, from, booking.status
    );
    Ok(booking)
}

async fn soft_delete_in_tx(
    tx: &mut dyn StoreTx,
    actor: &Actor,
    booking_id: Uuid,
) -> CoreResult<Booking> {
    let mut booking = load_accessible(tx, actor, booking_id).await?;
    BookingStatusMachine::soft_delete(&mut booking);
    tx.update_booking(&booking).await?;

    info!("Soft-deleted booking {}", booking.booking_number);
    Ok(booking)
}

async fn restore_in_tx(
    tx: &mut dyn StoreTx,
    actor: &Actor,
    booking_id: Uuid,
) -> CoreResult<Booking> {
    let mut booking = load_accessible(tx, actor, booking_id).await?;
    if BookingStatusMachine::restore(&mut booking) {
        tx.update_booking(&booking).await?;
        info!("Restored booking {}", booking.booking_number);
    }
    Ok(booking)
}

async fn remove_passenger(tx: &mut dyn StoreTx, passenger_id: Uuid) -> CoreResult<()> {
    for ticket in tx.tickets_for_passenger(passenger_id).await? {
        TicketIssuer::revoke(tx, ticket.id).await?;
    }
    tx.delete_passenger(passenger_id).await
}

async fn hard_delete_in_tx(tx: &mut dyn StoreTx, booking_id: Uuid) -> CoreResult<()> {
    let booking = load_booking(tx, booking_id).await?;

    for passenger in tx.passengers_for_booking(booking.id).await? {
        remove_passenger(tx, passenger.id).await?;
    }
    tx.delete_booking(booking.id).await?;

    info!("Hard-deleted booking {}", booking.booking_number);
    Ok(())
}

async fn add_passenger_in_tx(
    tx: &mut dyn StoreTx,
    max_passengers: usize,
    booking_id: Uuid,
    request: AddPassenger,
) -> CoreResult<BookingDetail> {
    let booking = load_booking(tx, booking_id).await?;

    if booking.status == BookingStatus::Cancelled {
        return Err(invalid(format!(
            "booking {} is cancelled and cannot take new passengers",
            booking.booking_number
        )));
    }
    if tx.get_flight(request.flight_id).await?.is_none() {
        warn!("Flight not found with ID: {}", request.flight_id);
        return Err(BookingError::not_found(Entity::Flight, request.flight_id));
    }

    let existing = tx.passengers_for_booking(booking.id).await?;
    if existing.len() >= max_passengers {
        return Err(invalid(format!(
            "booking {} already holds the maximum of {} passengers",
            booking.booking_number, max_passengers
        )));
    }
    // A booking covers a single flight.
    for passenger in &existing {
        let tickets = tx.tickets_for_passenger(passenger.id).await?;
        if let Some(other) = tickets.iter().find(|t| t.flight_id != request.flight_id) {
            return Err(invalid(format!(
                "booking {} is for flight {}, not {}",
                booking.booking_number, other.flight_id, request.flight_id
            )));
        }
    }

    let passenger = PassengerRegistrar::register(tx, booking.id, request.passenger).await?;
    TicketIssuer::issue(tx, passenger.id, request.flight_id, request.seat_id).await?;

    build_detail(tx, booking).await
}

async fn update_passenger_in_tx(
    tx: &mut dyn StoreTx,
    actor: &Actor,
    passenger_id: Uuid,
    patch: PassengerPatch,
) -> CoreResult<Passenger> {
    let passenger = PassengerRegistrar::get(tx, passenger_id).await?;
    load_accessible(tx, actor, passenger.booking_id).await?;
    PassengerRegistrar::update(tx, passenger.id, patch).await
}

async fn revoke_in_tx(tx: &mut dyn StoreTx, ticket_id: Uuid) -> CoreResult<()> {
    let ticket = TicketIssuer::revoke(tx, ticket_id).await?;

    if tx.tickets_for_passenger(ticket.passenger_id).await?.is_empty() {
        tx.delete_passenger(ticket.passenger_id).await?;
        info!("Removed passenger {} along with its last ticket", ticket.passenger_id);
    }
    Ok(())
}

async fn finish<T>(tx: Box<dyn StoreTx>, result: CoreResult<T>) -> CoreResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if e.is_server_fault() {
                error!("Rolling back transaction: {}", e);
            } else {
                debug!("Rolling back transaction: {}", e);
            }
            if let Err(rollback_err) = tx.rollback().await {
                error!("Rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}
