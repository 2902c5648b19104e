use aero_core::{Actor, Seat};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SeatFilter {
    #[serde(default)]
    pub available_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewSeat {
    pub seat_number: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/flights/{id}/seats", get(list_seats))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/v1/admin/flights/{id}/seats", post(add_seat))
}

async fn list_seats(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
    Query(filter): Query<SeatFilter>,
) -> Result<Json<Vec<Seat>>, AppError> {
    let seats = state
        .bookings
        .list_seats(flight_id, filter.available_only)
        .await?;
    Ok(Json(seats))
}

async fn add_seat(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(flight_id): Path<Uuid>,
    Json(req): Json<NewSeat>,
) -> Result<(StatusCode, Json<Seat>), AppError> {
    let seat = state
        .bookings
        .add_seat(&actor, flight_id, &req.seat_number)
        .await?;
    Ok((StatusCode::CREATED, Json(seat)))
}
