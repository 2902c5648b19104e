use aero_booking::{AddPassenger, NewBooking};
use aero_core::{
    Actor, Booking, BookingDetail, BookingPatch, BookingQuery, BookingStatus, Page, PassengerInfo,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub flight_id: Uuid,
    pub total_price: i64,
    pub passengers: Vec<PassengerInfo>,
    /// One entry per passenger; `null` lets the server pick a seat.
    pub seat_ids: Vec<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: BookingStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route(
            "/v1/bookings/{id}",
            get(get_booking).patch(update_booking).delete(soft_delete),
        )
        .route("/v1/bookings/{id}/status", put(update_status))
        .route("/v1/bookings/{id}/restore", post(restore_booking))
        .route("/v1/bookings/{id}/passengers", post(add_passenger))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/v1/admin/bookings/{id}", delete(hard_delete))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingDetail>), AppError> {
    let detail = state
        .bookings
        .create_detailed_booking(NewBooking {
            user_id: actor.user_id,
            total_price: req.total_price,
            passengers: req.passengers,
            flight_id: req.flight_id,
            seat_ids: req.seat_ids,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Page<Booking>>, AppError> {
    let page = state.bookings.list_bookings(&actor, query).await?;
    Ok(Json(page))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetail>, AppError> {
    let detail = state.bookings.get_booking_detail(&actor, id).await?;
    Ok(Json(detail))
}

async fn update_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.update_booking(&actor, id, patch).await?;
    Ok(Json(booking))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.update_status(&actor, id, req.status).await?;
    Ok(Json(booking))
}

async fn soft_delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.soft_delete(&actor, id).await?;
    Ok(Json(booking))
}

async fn restore_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.restore(&actor, id).await?;
    Ok(Json(booking))
}

async fn add_passenger(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddPassenger>,
) -> Result<(StatusCode, Json<BookingDetail>), AppError> {
    let detail = state.bookings.add_passenger(&actor, id, req).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn hard_delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.bookings.hard_delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
