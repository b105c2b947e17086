//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use booking::BookingError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed path parameter or body.
    #[error("{0}")]
    BadRequest(String),

    /// Error returned by the booking engine.
    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Booking(err) => booking_error_status(err),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Booking(err) => err.kind(),
        }
    }
}

fn booking_error_status(err: &BookingError) -> StatusCode {
    match err {
        BookingError::SeatsUnavailable { .. }
        | BookingError::NotCancellable { .. }
        | BookingError::InvalidState(_)
        | BookingError::RefundAlreadyIssued(_)
        | BookingError::PaymentInFlight(_) => StatusCode::CONFLICT,
        BookingError::PaymentDeclined { .. } => StatusCode::PAYMENT_REQUIRED,
        BookingError::PaymentGateway { .. } | BookingError::RefundFailed { .. } => {
            StatusCode::BAD_GATEWAY
        }
        BookingError::TicketNotFound(_)
        | BookingError::ShowNotFound(_)
        | BookingError::UserNotFound(_)
        | BookingError::SeatNotFound { .. }
        | BookingError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
        BookingError::InvalidRequest(_) | BookingError::Pricing(_) => StatusCode::BAD_REQUEST,
        BookingError::CompensationFailed { .. } | BookingError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        }
        metrics::counter!("api_errors_total", "status" => status.as_u16().to_string())
            .increment(1);

        let body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        (status, axum::Json(body)).into_response()
    }
}
