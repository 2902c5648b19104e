use aero_core::{Actor, TicketWithSeat};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SeatChange {
    pub seat_id: Uuid,
}

/// Ticket changes are administrative; they sit behind the admin middleware.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/tickets/{id}/seat", put(reassign_seat))
        .route("/v1/admin/tickets/{id}", delete(revoke_ticket))
}

async fn reassign_seat(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<SeatChange>,
) -> Result<Json<TicketWithSeat>, AppError> {
    let ticket = state.bookings.reassign_seat(&actor, id, req.seat_id).await?;
    Ok(Json(ticket))
}

async fn revoke_ticket(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.bookings.revoke_ticket(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
