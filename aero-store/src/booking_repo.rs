use aero_core::{
    Booking, BookingError, BookingQuery, BookingStore, CoreResult, Entity, Flight, Passenger,
    Seat, StoreTx, Ticket, ViewFilter,
};
use aero_shared::Masked;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{error, warn};
use uuid::Uuid;

/// PostgreSQL implementation of [`BookingStore`].
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error(Entity::Booking, e))?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// Rows are ordered by cabin position: numeric row first, then the letter
/// suffix. Seat numbers without a row sort last.
const SEAT_ORDER: &str = "NULLIF(substring(seat_number from '^[0-9]+'), '')::int ASC NULLS LAST, \
     regexp_replace(seat_number, '^[0-9]+', '') ASC";

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    departure_code: String,
    arrival_code: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    base_price: i64,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            id: row.id,
            flight_number: row.flight_number,
            departure_code: row.departure_code,
            arrival_code: row.arrival_code,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            base_price: row.base_price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: Uuid,
    flight_id: Uuid,
    seat_number: String,
    is_available: bool,
}

impl From<SeatRow> for Seat {
    fn from(row: SeatRow) -> Self {
        Seat {
            id: row.id,
            flight_id: row.flight_id,
            seat_number: row.seat_number,
            is_available: row.is_available,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_number: String,
    booking_date: DateTime<Utc>,
    total_price: i64,
    status: String,
    deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    user_id: Uuid,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            BookingError::Storage(format!(
                "booking {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;

        Ok(Booking {
            id: row.id,
            booking_number: row.booking_number,
            booking_date: row.booking_date,
            total_price: row.total_price,
            status,
            deleted: row.deleted,
            deleted_at: row.deleted_at,
            user_id: row.user_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    id: Uuid,
    booking_id: Uuid,
    first_name: String,
    last_name: String,
    nationality: String,
    date_of_birth: NaiveDate,
    passport_number: Option<String>,
}

impl From<PassengerRow> for Passenger {
    fn from(row: PassengerRow) -> Self {
        Passenger {
            id: row.id,
            booking_id: row.booking_id,
            first_name: row.first_name,
            last_name: row.last_name,
            nationality: row.nationality,
            date_of_birth: row.date_of_birth,
            passport_number: row.passport_number.map(Masked),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    ticket_number: String,
    passenger_id: Uuid,
    flight_id: Uuid,
    seat_id: Uuid,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            ticket_number: row.ticket_number,
            passenger_id: row.passenger_id,
            flight_id: row.flight_id,
            seat_id: row.seat_id,
        }
    }
}

/// SQLSTATE for a value wider than its column.
const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";

/// Unique and foreign-key violations are integrity problems of `entity`; an
/// over-wide value is the caller's input. Anything else is a storage failure.
fn db_error(entity: Entity, e: sqlx::Error) -> BookingError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
            error!("{} integrity violation: {}", entity, db_err.message());
            return BookingError::integrity(entity, db_err.message());
        }
        if db_err.code().as_deref() == Some(STRING_DATA_RIGHT_TRUNCATION) {
            warn!("{} rejected by column width: {}", entity, db_err.message());
            return BookingError::Validation(format!("{}: {}", entity, db_err.message()));
        }
    }
    error!("Database error on {}: {}", entity, e);
    BookingError::Storage(e.to_string())
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &BookingQuery) {
    qb.push(" WHERE TRUE");
    match query.view {
        ViewFilter::Active => {
            qb.push(" AND deleted = FALSE");
        }
        ViewFilter::Deleted => {
            qb.push(" AND deleted = TRUE");
        }
        ViewFilter::All => {}
    }
    if let Some(user_id) = query.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

const BOOKING_COLUMNS: &str =
    "id, booking_number, booking_date, total_price, status, deleted, deleted_at, user_id";
const PASSENGER_COLUMNS: &str =
    "id, booking_id, first_name, last_name, nationality, date_of_birth, passport_number";
const TICKET_COLUMNS: &str = "id, ticket_number, passenger_id, flight_id, seat_id";

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn get_flight(&mut self, id: Uuid) -> CoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(
            "SELECT id, flight_number, departure_code, arrival_code, departure_time, arrival_time, base_price \
             FROM flights WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error(Entity::Flight, e))?;

        Ok(row.map(Flight::from))
    }

    async fn get_seat(&mut self, id: Uuid) -> CoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(
            "SELECT id, flight_id, seat_number, is_available FROM seats WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error(Entity::Seat, e))?;

        Ok(row.map(Seat::from))
    }

    async fn find_seat_by_number(
        &mut self,
        flight_id: Uuid,
        seat_number: &str,
    ) -> CoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(
            "SELECT id, flight_id, seat_number, is_available FROM seats \
             WHERE flight_id = $1 AND seat_number = $2",
        )
        .bind(flight_id)
        .bind(seat_number)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error(Entity::Seat, e))?;

        Ok(row.map(Seat::from))
    }

    async fn first_available_seat(&mut self, flight_id: Uuid) -> CoreResult<Option<Seat>> {
        // Seats locked by a concurrent booking are skipped rather than waited on.
        let sql = format!(
            "SELECT id, flight_id, seat_number, is_available FROM seats \
             WHERE flight_id = $1 AND is_available \
             ORDER BY {} LIMIT 1 FOR UPDATE SKIP LOCKED",
            SEAT_ORDER
        );
        let row = sqlx::query_as::<_, SeatRow>(&sql)
            .bind(flight_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Seat, e))?;

        Ok(row.map(Seat::from))
    }

    async fn list_seats(&mut self, flight_id: Uuid, available_only: bool) -> CoreResult<Vec<Seat>> {
        let sql = format!(
            "SELECT id, flight_id, seat_number, is_available FROM seats \
             WHERE flight_id = $1 AND (is_available OR NOT $2) \
             ORDER BY {}",
            SEAT_ORDER
        );
        let rows = sqlx::query_as::<_, SeatRow>(&sql)
            .bind(flight_id)
            .bind(available_only)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Seat, e))?;

        Ok(rows.into_iter().map(Seat::from).collect())
    }

    async fn insert_seat(&mut self, seat: &Seat) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO seats (id, flight_id, seat_number, is_available) VALUES ($1, $2, $3, $4)",
        )
        .bind(seat.id)
        .bind(seat.flight_id)
        .bind(&seat.seat_number)
        .bind(seat.is_available)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error(Entity::Seat, e))?;
        Ok(())
    }

    async fn claim_seat(&mut self, seat_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE seats SET is_available = FALSE WHERE id = $1 AND is_available",
        )
        .bind(seat_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error(Entity::Seat, e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn free_seat(&mut self, seat_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE seats SET is_available = TRUE WHERE id = $1")
            .bind(seat_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Seat, e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, booking_number, booking_date, total_price, status, deleted, deleted_at, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.booking_number)
        .bind(booking.booking_date)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(booking.deleted)
        .bind(booking.deleted_at)
        .bind(booking.user_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error(Entity::Booking, e))?;
        Ok(())
    }

    async fn get_booking(&mut self, id: Uuid) -> CoreResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Booking, e))?;

        row.map(Booking::try_from).transpose()
    }

    async fn update_booking(&mut self, booking: &Booking) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET total_price = $2, status = $3, deleted = $4, deleted_at = $5
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(booking.deleted)
        .bind(booking.deleted_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error(Entity::Booking, e))?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found(Entity::Booking, booking.id));
        }
        Ok(())
    }

    async fn delete_booking(&mut self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Booking, e))?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found(Entity::Booking, id));
        }
        Ok(())
    }

    async fn list_bookings(
        &mut self,
        query: &BookingQuery,
        limit: u64,
    ) -> CoreResult<(Vec<Booking>, u64)> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings");
        push_filters(&mut count_qb, query);
        let count: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Booking, e))?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM bookings", BOOKING_COLUMNS));
        push_filters(&mut qb, query);
        qb.push(" ORDER BY booking_date DESC, id ASC LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.skip).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<BookingRow>()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Booking, e))?;

        let bookings = rows
            .into_iter()
            .map(Booking::try_from)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok((bookings, count.max(0) as u64))
    }

    async fn insert_passenger(&mut self, passenger: &Passenger) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO passengers (id, booking_id, first_name, last_name, nationality, date_of_birth, passport_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(passenger.id)
        .bind(passenger.booking_id)
        .bind(&passenger.first_name)
        .bind(&passenger.last_name)
        .bind(&passenger.nationality)
        .bind(passenger.date_of_birth)
        .bind(passenger.passport_number.as_ref().map(|p| p.expose().clone()))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error(Entity::Passenger, e))?;
        Ok(())
    }

    async fn get_passenger(&mut self, id: Uuid) -> CoreResult<Option<Passenger>> {
        let sql = format!("SELECT {} FROM passengers WHERE id = $1", PASSENGER_COLUMNS);
        let row = sqlx::query_as::<_, PassengerRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Passenger, e))?;

        Ok(row.map(Passenger::from))
    }

    async fn update_passenger(&mut self, passenger: &Passenger) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE passengers
            SET first_name = $2, last_name = $3, nationality = $4, date_of_birth = $5, passport_number = $6
            WHERE id = $1
            "#,
        )
        .bind(passenger.id)
        .bind(&passenger.first_name)
        .bind(&passenger.last_name)
        .bind(&passenger.nationality)
        .bind(passenger.date_of_birth)
        .bind(passenger.passport_number.as_ref().map(|p| p.expose().clone()))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error(Entity::Passenger, e))?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found(Entity::Passenger, passenger.id));
        }
        Ok(())
    }

    async fn delete_passenger(&mut self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM passengers WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Passenger, e))?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found(Entity::Passenger, id));
        }
        Ok(())
    }

    async fn passengers_for_booking(&mut self, booking_id: Uuid) -> CoreResult<Vec<Passenger>> {
        let sql = format!(
            "SELECT {} FROM passengers WHERE booking_id = $1 ORDER BY seq",
            PASSENGER_COLUMNS
        );
        let rows = sqlx::query_as::<_, PassengerRow>(&sql)
            .bind(booking_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Passenger, e))?;

        Ok(rows.into_iter().map(Passenger::from).collect())
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tickets (id, ticket_number, passenger_id, flight_id, seat_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(ticket.id)
        .bind(&ticket.ticket_number)
        .bind(ticket.passenger_id)
        .bind(ticket.flight_id)
        .bind(ticket.seat_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error(Entity::Ticket, e))?;
        Ok(())
    }

    async fn get_ticket(&mut self, id: Uuid) -> CoreResult<Option<Ticket>> {
        let sql = format!("SELECT {} FROM tickets WHERE id = $1", TICKET_COLUMNS);
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Ticket, e))?;

        Ok(row.map(Ticket::from))
    }

    async fn set_ticket_seat(&mut self, ticket_id: Uuid, seat_id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("UPDATE tickets SET seat_id = $2 WHERE id = $1")
            .bind(ticket_id)
            .bind(seat_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Ticket, e))?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found(Entity::Ticket, ticket_id));
        }
        Ok(())
    }

    async fn delete_ticket(&mut self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Ticket, e))?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found(Entity::Ticket, id));
        }
        Ok(())
    }

    async fn tickets_for_passenger(&mut self, passenger_id: Uuid) -> CoreResult<Vec<Ticket>> {
        let sql = format!(
            "SELECT {} FROM tickets WHERE passenger_id = $1 ORDER BY ticket_number",
            TICKET_COLUMNS
        );
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(passenger_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| db_error(Entity::Ticket, e))?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_error(Entity::Booking, e))
    }

    async fn rollback(self: Box<Self>) -> CoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| db_error(Entity::Booking, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_core::BookingStatus;

    fn booking_row(status: &str) -> BookingRow {
        BookingRow {
            id: Uuid::new_v4(),
            booking_number: "BK2026ABC123".to_string(),
            booking_date: Utc::now(),
            total_price: 9900,
            status: status.to_string(),
            deleted: false,
            deleted_at: None,
            user_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_booking_row_conversion() {
        let booking = Booking::try_from(booking_row("confirmed")).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.total_price, 9900);
    }

    #[test]
    fn test_unknown_status_is_storage_error() {
        let err = Booking::try_from(booking_row("archived")).unwrap_err();
        assert!(matches!(err, BookingError::Storage(_)));
        assert!(err.is_server_fault());
    }

    #[test]
    fn test_passenger_row_masks_passport() {
        let passenger = Passenger::from(PassengerRow {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            first_name: "Mae".to_string(),
            last_name: "Jemison".to_string(),
            nationality: "US".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1956, 10, 17).unwrap(),
            passport_number: Some("PA1234567".to_string()),
        });

        let debug = format!("{:?}", passenger);
        assert!(!debug.contains("PA1234567"));
        assert_eq!(passenger.passport_number.unwrap().expose(), "PA1234567");
    }

    #[test]
    fn test_booking_filters_sql() {
        let query = BookingQuery {
            user_id: Some(Uuid::new_v4()),
            status: Some(BookingStatus::Pending),
            view: ViewFilter::Deleted,
            skip: 0,
            limit: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings");
        push_filters(&mut qb, &query);

        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM bookings WHERE TRUE AND deleted = TRUE AND user_id = $1 AND status = $2"
        );
    }
}
