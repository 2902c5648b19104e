use aero_core::{BookingError, ErrorKind};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    Booking(BookingError),
    Anyhow(anyhow::Error),
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::NoAvailableSeats => StatusCode::CONFLICT,
        ErrorKind::InvalidStatusTransition => StatusCode::BAD_REQUEST,
        ErrorKind::UnauthorizedAccess => StatusCode::FORBIDDEN,
        ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::IntegrityViolation | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::AuthenticationError(msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                (StatusCode::UNAUTHORIZED, "unauthenticated", msg)
            }
            AppError::AuthorizationError(msg) => {
                tracing::warn!("Authorization failed: {}", msg);
                (StatusCode::FORBIDDEN, "forbidden", msg)
            }
            AppError::Booking(err) if err.is_server_fault() => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    status_for(err.kind()),
                    err.code(),
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Booking(err) => {
                tracing::warn!("Request rejected: {}", err);
                (status_for(err.kind()), err.code(), err.to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_server_error",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "error_code": code,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        Self::Booking(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
