//! Booking attempt state machine.

use serde::{Deserialize, Serialize};

/// The state of one booking attempt in its lifecycle.
///
/// State transitions:
/// ```text
/// Start ──► SeatsLocked ──► PaymentPending ──► Confirmed
///               │                 │
///               └────────┬────────┘
///                        ▼
///                  Compensating ──► Void
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BookingState {
    /// Request received; nothing has been changed yet.
    #[default]
    Start,

    /// Every requested seat is locked by this attempt.
    SeatsLocked,

    /// A pending charge is recorded and the gateway is being called.
    PaymentPending,

    /// Paid for and seats booked (terminal state).
    Confirmed,

    /// A step failed and undo actions are running.
    Compensating,

    /// Compensation finished; the attempt left no lasting effect (terminal state).
    Void,
}

impl BookingState {
    /// Returns true if compensation can begin from this state.
    pub fn can_compensate(&self) -> bool {
        matches!(
            self,
            BookingState::SeatsLocked | BookingState::PaymentPending
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingState::Confirmed | BookingState::Void)
    }

    /// Returns true if the machine may move from `self` to `next`.
    pub fn can_transition_to(&self, next: BookingState) -> bool {
        use BookingState::*;
        matches!(
            (self, next),
            (Start, SeatsLocked)
                | (SeatsLocked, PaymentPending)
                | (PaymentPending, Confirmed)
                | (SeatsLocked, Compensating)
                | (PaymentPending, Compensating)
                | (Compensating, Void)
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingState::Start => "Start",
            BookingState::SeatsLocked => "SeatsLocked",
            BookingState::PaymentPending => "PaymentPending",
            BookingState::Confirmed => "Confirmed",
            BookingState::Compensating => "Compensating",
            BookingState::Void => "Void",
        }
    }
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
