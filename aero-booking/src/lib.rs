pub mod orchestrator;
pub mod passengers;
pub mod seats;
pub mod status;
pub mod tickets;

pub use orchestrator::{verify_access, AddPassenger, BookingOrchestrator, NewBooking};
pub use passengers::PassengerRegistrar;
pub use seats::SeatAllocator;
pub use status::BookingStatusMachine;
pub use tickets::TicketIssuer;
