use std::fmt;
use uuid::Uuid;

use crate::models::BookingStatus;

/// Entities addressable by ID, used to give errors their context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Booking,
    Passenger,
    Ticket,
    Seat,
    Flight,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Booking => "Booking",
            Entity::Passenger => "Passenger",
            Entity::Ticket => "Ticket",
            Entity::Seat => "Seat",
            Entity::Flight => "Flight",
        };
        f.write_str(name)
    }
}

/// Coarse classification of [`BookingError`], used by boundary layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    NoAvailableSeats,
    InvalidStatusTransition,
    UnauthorizedAccess,
    IntegrityViolation,
    ValidationError,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{entity} not found with ID: {id}")]
    NotFound { entity: Entity, id: Uuid },

    #[error("Seat {seat_number} is not available")]
    SeatNotAvailable { seat_id: Uuid, seat_number: String },

    #[error("Seat {seat_number} already exists for flight {flight_id}")]
    DuplicateSeat { flight_id: Uuid, seat_number: String },

    #[error("No available seats for flight {flight_id}")]
    NoAvailableSeats { flight_id: Uuid },

    #[error("Cannot change status of booking {booking_id} from {from} to {to}")]
    InvalidStatusTransition {
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("User {user_id} is not authorized to access booking {booking_id}")]
    UnauthorizedAccess { booking_id: Uuid, user_id: Uuid },

    #[error("User {user_id} needs administrator privileges to {action}")]
    PrivilegeRequired { user_id: Uuid, action: &'static str },

    #[error("{entity} integrity violation: {detail}")]
    IntegrityViolation { entity: Entity, detail: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl BookingError {
    pub fn not_found(entity: Entity, id: Uuid) -> Self {
        BookingError::NotFound { entity, id }
    }

    pub fn integrity(entity: Entity, detail: impl Into<String>) -> Self {
        BookingError::IntegrityViolation {
            entity,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::NotFound { .. } => ErrorKind::NotFound,
            BookingError::SeatNotAvailable { .. } | BookingError::DuplicateSeat { .. } => {
                ErrorKind::Conflict
            }
            BookingError::NoAvailableSeats { .. } => ErrorKind::NoAvailableSeats,
            BookingError::InvalidStatusTransition { .. } => ErrorKind::InvalidStatusTransition,
            BookingError::UnauthorizedAccess { .. } | BookingError::PrivilegeRequired { .. } => {
                ErrorKind::UnauthorizedAccess
            }
            BookingError::IntegrityViolation { .. } => ErrorKind::IntegrityViolation,
            BookingError::Validation(_) => ErrorKind::ValidationError,
            BookingError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Faults caused by the server rather than by the request.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::IntegrityViolation | ErrorKind::Internal
        )
    }

    /// Stable machine-readable code for responses.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::NotFound { entity, .. } => match entity {
                Entity::Booking => "booking_not_found",
                Entity::Passenger => "passenger_not_found",
                Entity::Ticket => "ticket_not_found",
                Entity::Seat => "seat_not_found",
                Entity::Flight => "flight_not_found",
            },
            BookingError::SeatNotAvailable { .. } => "seat_not_available",
            BookingError::DuplicateSeat { .. } => "seat_already_exists",
            BookingError::NoAvailableSeats { .. } => "no_available_seats",
            BookingError::InvalidStatusTransition { .. } => "invalid_status_transition",
            BookingError::UnauthorizedAccess { .. } => "unauthorized_booking_access",
            BookingError::PrivilegeRequired { .. } => "admin_privileges_required",
            BookingError::IntegrityViolation { .. } => "integrity_violation",
            BookingError::Validation(_) => "validation_error",
            BookingError::Storage(_) => "internal_server_error",
        }
    }
}

pub type CoreResult<T> = Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let seat = BookingError::SeatNotAvailable {
            seat_id: Uuid::new_v4(),
            seat_number: "1B".to_string(),
        };
        assert_eq!(seat.kind(), ErrorKind::Conflict);
        assert!(!seat.is_server_fault());
        assert_eq!(seat.to_string(), "Seat 1B is not available");

        let integrity = BookingError::integrity(Entity::Passenger, "fk violation");
        assert_eq!(integrity.kind(), ErrorKind::IntegrityViolation);
        assert!(integrity.is_server_fault());
    }

    #[test]
    fn test_not_found_message_carries_id() {
        let id = Uuid::new_v4();
        let err = BookingError::not_found(Entity::Flight, id);
        assert_eq!(err.to_string(), format!("Flight not found with ID: {}", id));
        assert_eq!(err.code(), "flight_not_found");
    }
}
