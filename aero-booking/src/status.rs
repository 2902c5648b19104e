use aero_core::{Booking, BookingError, BookingStatus, CoreResult};
use chrono::Utc;

/// Booking lifecycle rules. Operates on a loaded booking; persisting the
/// result is the caller's job.
pub struct BookingStatusMachine;

impl BookingStatusMachine {
    /// Every move is allowed except leaving `Cancelled`.
    pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
        from != BookingStatus::Cancelled || to == BookingStatus::Cancelled
    }

    pub fn transition(booking: &mut Booking, to: BookingStatus) -> CoreResult<()> {
        if !Self::can_transition(booking.status, to) {
            return Err(BookingError::InvalidStatusTransition {
                booking_id: booking.id,
                from: booking.status,
                to,
            });
        }
        booking.status = to;
        Ok(())
    }

    pub fn soft_delete(booking: &mut Booking) {
        booking.deleted = true;
        booking.deleted_at = Some(Utc::now());
    }

    /// Clears the soft-delete flag. Returns `false` when there was nothing to restore.
    pub fn restore(booking: &mut Booking) -> bool {
        if !booking.deleted {
            return false;
        }
        booking.deleted = false;
        booking.deleted_at = None;
        true
    }
}
