use aero_core::{BookingError, CoreResult, Entity, Seat, StoreTx, Ticket, TicketWithSeat};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::seats::SeatAllocator;

/// Binds passengers to seats.
pub struct TicketIssuer;

impl TicketIssuer {
    /// Issue a ticket for `passenger_id` on `flight_id`.
    ///
    /// With `seat_id` that seat is reserved; without one the first free seat of
    /// the flight is picked and reserved.
    pub async fn issue(
        tx: &mut dyn StoreTx,
        passenger_id: Uuid,
        flight_id: Uuid,
        seat_id: Option<Uuid>,
    ) -> CoreResult<TicketWithSeat> {
        let seat = match seat_id {
            Some(seat_id) => {
                let seat = Self::seat_on_flight(tx, seat_id, flight_id).await?;
                SeatAllocator::reserve(tx, seat.id).await?
            }
            None => {
                let candidate = SeatAllocator::find_available_seat(tx, flight_id).await?;
                SeatAllocator::reserve(tx, candidate.id).await?
            }
        };

        let ticket = Ticket::new(passenger_id, flight_id, seat.id);
        tx.insert_ticket(&ticket).await?;

        info!(
            "Issued ticket {} for passenger {} on seat {}",
            ticket.ticket_number, passenger_id, seat.seat_number
        );
        Ok(TicketWithSeat {
            ticket,
            seat_number: seat.seat_number,
        })
    }

    /// Move a ticket to another seat on the same flight.
    ///
    /// The new seat is reserved before the old one is released, so a taken
    /// seat leaves the ticket where it was.
    pub async fn reassign_seat(
        tx: &mut dyn StoreTx,
        ticket_id: Uuid,
        new_seat_id: Uuid,
    ) -> CoreResult<TicketWithSeat> {
        let mut ticket = Self::get(tx, ticket_id).await?;

        if ticket.seat_id == new_seat_id {
            debug!("Ticket {} already holds seat {}", ticket_id, new_seat_id);
            let seat = Self::seat_on_flight(tx, new_seat_id, ticket.flight_id).await?;
            return Ok(TicketWithSeat {
                ticket,
                seat_number: seat.seat_number,
            });
        }

        Self::seat_on_flight(tx, new_seat_id, ticket.flight_id).await?;
        let new_seat = SeatAllocator::reserve(tx, new_seat_id).await?;

        let old_seat_id = ticket.seat_id;
        tx.set_ticket_seat(ticket.id, new_seat.id).await?;
        SeatAllocator::release(tx, old_seat_id).await?;
        ticket.seat_id = new_seat.id;

        info!(
            "Reassigned ticket {} from seat {} to {}",
            ticket.ticket_number, old_seat_id, new_seat.seat_number
        );
        Ok(TicketWithSeat {
            ticket,
            seat_number: new_seat.seat_number,
        })
    }

    /// Release the bound seat and delete the ticket.
    pub async fn revoke(tx: &mut dyn StoreTx, ticket_id: Uuid) -> CoreResult<Ticket> {
        let ticket = Self::get(tx, ticket_id).await?;

        SeatAllocator::release(tx, ticket.seat_id).await?;
        tx.delete_ticket(ticket.id).await?;

        info!("Revoked ticket {}", ticket.ticket_number);
        Ok(ticket)
    }

    pub async fn tickets_for_passenger(
        tx: &mut dyn StoreTx,
        passenger_id: Uuid,
    ) -> CoreResult<Vec<TicketWithSeat>> {
        let tickets = tx.tickets_for_passenger(passenger_id).await?;
        let mut result = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let seat = tx.get_seat(ticket.seat_id).await?.ok_or_else(|| {
                BookingError::integrity(
                    Entity::Ticket,
                    format!("ticket {} references missing seat {}", ticket.id, ticket.seat_id),
                )
            })?;
            result.push(TicketWithSeat {
                ticket,
                seat_number: seat.seat_number,
            });
        }
        Ok(result)
    }

    pub async fn get(tx: &mut dyn StoreTx, ticket_id: Uuid) -> CoreResult<Ticket> {
        tx.get_ticket(ticket_id)
            .await?
            .ok_or_else(|| BookingError::not_found(Entity::Ticket, ticket_id))
    }

    async fn seat_on_flight(tx: &mut dyn StoreTx, seat_id: Uuid, flight_id: Uuid) -> CoreResult<Seat> {
        let seat = tx
            .get_seat(seat_id)
            .await?
            .ok_or_else(|| BookingError::not_found(Entity::Seat, seat_id))?;

        if seat.flight_id != flight_id {
            warn!("Seat {} belongs to flight {}, not {}", seat.seat_number, seat.flight_id, flight_id);
            return Err(BookingError::Validation(format!(
                "seat {} does not belong to flight {}",
                seat.seat_number, flight_id
            )));
        }
        Ok(seat)
    }
}
