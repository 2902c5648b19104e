use aero_core::{Actor, Passenger, PassengerPatch};
use axum::{
    extract::{Path, State},
    routing::patch,
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/passengers/{id}", patch(update_passenger))
}

async fn update_passenger(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(patch): Json<PassengerPatch>,
) -> Result<Json<Passenger>, AppError> {
    let passenger = state.bookings.update_passenger(&actor, id, patch).await?;
    Ok(Json(passenger))
}
