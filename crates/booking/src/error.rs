//! Booking engine error types.

use common::{SeatId, ShowId, TicketId, TransactionId, UserId};
use domain::{DomainError, PricingError};
use thiserror::Error;

/// Errors that can occur during booking, cancellation and payment operations.
#[derive(Debug, Clone, Error)]
pub enum BookingError {
    /// One or more requested seats were not available at lock time.
    #[error("Seat {seat_id} is not available for show {show_id}")]
    SeatsUnavailable { show_id: ShowId, seat_id: SeatId },

    /// The payment gateway declined the charge.
    #[error("Payment declined: {reason}")]
    PaymentDeclined { reason: String },

    /// The payment gateway failed or timed out.
    #[error("Payment gateway error: {reason}")]
    PaymentGateway { reason: String },

    /// An internal invariant was violated.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Business rules forbid cancelling the ticket.
    #[error("Ticket {ticket_id} cannot be cancelled: {reason}")]
    NotCancellable { ticket_id: TicketId, reason: String },

    /// The refund attempt failed; the ticket stays confirmed.
    #[error("Refund for ticket {ticket_id} failed: {reason}")]
    RefundFailed { ticket_id: TicketId, reason: String },

    /// Undo actions could not be completed and need manual reconciliation.
    #[error("Compensation for ticket {ticket_id} failed: {reason}")]
    CompensationFailed { ticket_id: TicketId, reason: String },

    /// A refund is already pending or completed for this charge.
    #[error("Refund already issued for payment {0}")]
    RefundAlreadyIssued(TransactionId),

    /// The entry is still owned by the booking or cancellation that created it.
    #[error("Payment {0} is still being processed")]
    PaymentInFlight(TransactionId),

    #[error("Ticket not found: {0}")]
    TicketNotFound(TicketId),

    #[error("Show not found: {0}")]
    ShowNotFound(ShowId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Seat {seat_id} does not exist for show {show_id}")]
    SeatNotFound { show_id: ShowId, seat_id: SeatId },

    #[error("Payment not found: {0}")]
    PaymentNotFound(TransactionId),

    /// The caller supplied a malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Pricing rejected the seat prices.
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// A storage collaborator failed transiently.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BookingError {
    /// Returns true for errors that indicate a defect or an inconsistency
    /// requiring operator attention rather than a business rejection.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            BookingError::InvalidState(_) | BookingError::CompensationFailed { .. }
        )
    }

    /// Short machine-readable label, used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::SeatsUnavailable { .. } => "seats_unavailable",
            BookingError::PaymentDeclined { .. } => "payment_declined",
            BookingError::PaymentGateway { .. } => "payment_gateway",
            BookingError::InvalidState(_) => "invalid_state",
            BookingError::NotCancellable { .. } => "not_cancellable",
            BookingError::RefundFailed { .. } => "refund_failed",
            BookingError::CompensationFailed { .. } => "compensation_failed",
            BookingError::RefundAlreadyIssued(_) => "refund_already_issued",
            BookingError::PaymentInFlight(_) => "payment_in_flight",
            BookingError::TicketNotFound(_) => "ticket_not_found",
            BookingError::ShowNotFound(_) => "show_not_found",
            BookingError::UserNotFound(_) => "user_not_found",
            BookingError::SeatNotFound { .. } => "seat_not_found",
            BookingError::PaymentNotFound(_) => "payment_not_found",
            BookingError::InvalidRequest(_) => "invalid_request",
            BookingError::Pricing(_) => "pricing",
            BookingError::Storage(_) => "storage",
        }
    }
}

impl From<DomainError> for BookingError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NoSeats | DomainError::DuplicateSeat(_) => {
                BookingError::InvalidRequest(err.to_string())
            }
            other => BookingError::InvalidState(other.to_string()),
        }
    }
}

/// Convenience type alias for booking results.
pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defect_classification() {
        assert!(BookingError::InvalidState("x".into()).is_defect());
        assert!(
            BookingError::CompensationFailed {
                ticket_id: TicketId::new(),
                reason: "x".into()
            }
            .is_defect()
        );
        assert!(!BookingError::PaymentDeclined { reason: "x".into() }.is_defect());
        assert!(!BookingError::PaymentInFlight(TransactionId::generate()).is_defect());
    }

    #[test]
    fn test_domain_error_mapping() {
        let err: BookingError = DomainError::NoSeats.into();
        assert!(matches!(err, BookingError::InvalidRequest(_)));

        let err: BookingError = DomainError::InvalidPolicy("bad".into()).into();
        assert!(matches!(err, BookingError::InvalidState(_)));
    }
}
