pub mod error;
pub mod identity;
pub mod memory;
pub mod models;
pub mod patch;
pub mod repository;
pub mod rules;

pub use error::{BookingError, CoreResult, Entity, ErrorKind};
pub use identity::Actor;
pub use memory::InMemoryBookingStore;
pub use models::{
    Booking, BookingDetail, BookingQuery, BookingStatus, Flight, Page, Passenger,
    PassengerDetail, PassengerInfo, Seat, Ticket, TicketWithSeat, ViewFilter,
};
pub use patch::{BookingPatch, PassengerPatch};
pub use repository::{BookingStore, StoreTx};
pub use rules::BookingRules;
