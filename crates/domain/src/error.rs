//! Domain error types.

use common::{Money, SeatId};
use thiserror::Error;

/// Errors raised by entity state machines and policy validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An entity was asked to move to a state its current state does not allow.
    #[error("Invalid {entity} transition: cannot {action} from {current_state} state")]
    InvalidTransition {
        entity: &'static str,
        current_state: String,
        action: &'static str,
    },

    /// A seat transition was attempted by a booking that does not hold it.
    #[error("Seat {seat_id} is not held by the requesting booking")]
    NotSeatHolder { seat_id: SeatId },

    /// A booking was requested without any seats.
    #[error("Booking must include at least one seat")]
    NoSeats,

    /// The same seat appears more than once in a booking request.
    #[error("Duplicate seat in booking: {0}")]
    DuplicateSeat(SeatId),

    /// An amount is outside the range allowed for the operation.
    #[error("Invalid amount: {amount} ({reason})")]
    InvalidAmount { amount: Money, reason: &'static str },

    /// A policy was configured with inconsistent values.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}
