use aero_shared::Masked;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BookingError;

// Widths of the matching VARCHAR columns.
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_NATIONALITY_LEN: usize = 64;
pub const MAX_PASSPORT_LEN: usize = 32;
pub const MAX_SEAT_NUMBER_LEN: usize = 8;

pub(crate) fn check_required(field: &str, value: &str, max: usize) -> Result<(), BookingError> {
    if value.trim().is_empty() {
        return Err(BookingError::Validation(format!("{} must not be empty", field)));
    }
    check_width(field, value, max)
}

pub(crate) fn check_passport(passport: &Masked<String>) -> Result<(), BookingError> {
    check_width("passport_number", &passport.0, MAX_PASSPORT_LEN)
}

fn check_width(field: &str, value: &str, max: usize) -> Result<(), BookingError> {
    if value.chars().count() > max {
        return Err(BookingError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Booking status in the lifecycle. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(BookingError::Validation(format!(
                "unknown booking status: {}",
                other
            ))),
        }
    }
}

/// A reservation owned by one user covering one or more passengers on a flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub booking_date: DateTime<Utc>,
    /// Amount in minor currency units.
    pub total_price: i64,
    pub status: BookingStatus,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub user_id: Uuid,
}

impl Booking {
    pub fn new(user_id: Uuid, total_price: i64, number_prefix: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_number: generate_booking_number(number_prefix, now),
            booking_date: now,
            total_price,
            status: BookingStatus::Pending,
            deleted: false,
            deleted_at: None,
            user_id,
        }
    }
}

/// `{prefix}{year}{6 uppercase alphanumerics}`, e.g. `BK2026Q7ZK1M`.
pub fn generate_booking_number(prefix: &str, at: DateTime<Utc>) -> String {
    let code: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect();
    format!("{}{}{}", prefix, at.year(), code)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub departure_code: String,
    pub arrival_code: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub base_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seat {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub seat_number: String,
    pub is_available: bool,
}

impl Seat {
    /// Rejects blank seat numbers and ones wider than the seats column.
    pub fn validate_number(seat_number: &str) -> Result<(), BookingError> {
        check_required("seat_number", seat_number, MAX_SEAT_NUMBER_LEN)
    }

    pub fn new(flight_id: Uuid, seat_number: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_id,
            seat_number: seat_number.into(),
            is_available: true,
        }
    }

    /// Cabin position used for deterministic ordering: row first, then letter.
    /// Seat numbers without a leading row sort after all numbered rows.
    pub fn position(&self) -> (u32, String) {
        let digits: String = self
            .seat_number
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let row = digits.parse::<u32>().unwrap_or(u32::MAX);
        (row, self.seat_number[digits.len()..].to_string())
    }
}

/// Traveler data supplied when creating a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassengerInfo {
    pub first_name: String,
    pub last_name: String,
    pub nationality: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub passport_number: Option<Masked<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passenger {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub nationality: String,
    pub date_of_birth: NaiveDate,
    pub passport_number: Option<Masked<String>>,
}

impl PassengerInfo {
    pub fn validate(&self) -> Result<(), BookingError> {
        check_required("first_name", &self.first_name, MAX_NAME_LEN)?;
        check_required("last_name", &self.last_name, MAX_NAME_LEN)?;
        check_required("nationality", &self.nationality, MAX_NATIONALITY_LEN)?;
        if let Some(passport) = &self.passport_number {
            check_passport(passport)?;
        }
        Ok(())
    }
}

impl Passenger {
    pub fn new(booking_id: Uuid, info: PassengerInfo) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            first_name: info.first_name,
            last_name: info.last_name,
            nationality: info.nationality,
            date_of_birth: info.date_of_birth,
            passport_number: info.passport_number,
        }
    }
}

/// Binding of one passenger to one seat on one flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub seat_id: Uuid,
}

impl Ticket {
    pub fn new(passenger_id: Uuid, flight_id: Uuid, seat_id: Uuid) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            ticket_number: generate_ticket_number(&id),
            passenger_id,
            flight_id,
            seat_id,
        }
    }
}

// Format: TK{timestamp}{short_uuid}
fn generate_ticket_number(ticket_id: &Uuid) -> String {
    let timestamp = Utc::now().timestamp();
    let short_id = &ticket_id.simple().to_string()[..8];
    format!("TK{}{}", timestamp, short_id.to_uppercase())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketWithSeat {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub seat_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassengerDetail {
    #[serde(flatten)]
    pub passenger: Passenger,
    pub tickets: Vec<TicketWithSeat>,
}

/// A booking with its passengers and their tickets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub passengers: Vec<PassengerDetail>,
}

impl BookingDetail {
    pub fn ticket_count(&self) -> usize {
        self.passengers.iter().map(|p| p.tickets.len()).sum()
    }
}

/// Which side of the soft-delete flag a listing covers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewFilter {
    #[default]
    Active,
    Deleted,
    All,
}

impl ViewFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        match self {
            ViewFilter::Active => !booking.deleted,
            ViewFilter::Deleted => booking.deleted,
            ViewFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingQuery {
    pub user_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub view: ViewFilter,
    #[serde(default)]
    pub skip: u64,
    pub limit: Option<u64>,
}

impl BookingQuery {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.view.matches(booking)
            && self.user_id.map_or(true, |u| booking.user_id == u)
            && self.status.map_or(true, |s| booking.status == s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_number_format() {
        let at = "2026-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let number = generate_booking_number("BK", at);

        assert!(number.starts_with("BK2026"));
        assert_eq!(number.len(), 12);
        assert!(number[6..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_new_booking_is_pending() {
        let booking = Booking::new(Uuid::new_v4(), 500, "BK");
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(!booking.deleted);
        assert!(booking.deleted_at.is_none());
    }

    #[test]
    fn test_seat_position_ordering() {
        let flight = Uuid::new_v4();
        let mut seats = vec![
            Seat::new(flight, "10A"),
            Seat::new(flight, "2C"),
            Seat::new(flight, "2A"),
            Seat::new(flight, "JUMP"),
        ];
        seats.sort_by_key(|s| s.position());

        let order: Vec<&str> = seats.iter().map(|s| s.seat_number.as_str()).collect();
        assert_eq!(order, vec!["2A", "2C", "10A", "JUMP"]);
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("archived".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_passenger_info_field_limits() {
        let info = PassengerInfo {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            nationality: "GB".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
            passport_number: Some(Masked("GB1234567".to_string())),
        };
        assert!(info.validate().is_ok());

        let blank = PassengerInfo {
            first_name: "  ".to_string(),
            ..info.clone()
        };
        assert!(matches!(blank.validate(), Err(BookingError::Validation(_))));

        let long_passport = PassengerInfo {
            passport_number: Some(Masked("P".repeat(MAX_PASSPORT_LEN + 1))),
            ..info.clone()
        };
        assert!(matches!(long_passport.validate(), Err(BookingError::Validation(_))));

        // Width counts characters, not bytes
        let accented = PassengerInfo {
            last_name: "é".repeat(MAX_NAME_LEN),
            ..info
        };
        assert!(accented.validate().is_ok());
    }

    #[test]
    fn test_seat_number_limits() {
        assert!(Seat::validate_number("12C").is_ok());
        assert!(Seat::validate_number("").is_err());
        assert!(Seat::validate_number("123456789").is_err());
    }

    #[test]
    fn test_view_filter() {
        let mut booking = Booking::new(Uuid::new_v4(), 100, "BK");
        assert!(ViewFilter::Active.matches(&booking));
        assert!(!ViewFilter::Deleted.matches(&booking));

        booking.deleted = true;
        assert!(!ViewFilter::Active.matches(&booking));
        assert!(ViewFilter::Deleted.matches(&booking));
        assert!(ViewFilter::All.matches(&booking));
    }
}
