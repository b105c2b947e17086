//! Per-show seat records.

use common::{Money, SeatId, ShowId, TicketId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The booking status of a seat for one show.
///
/// State transitions:
/// ```text
/// Available ──► Locked ──► Booked
///     ▲           │          │
///     └───────────┴──────────┘  (release)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SeatStatus {
    /// Nobody holds the seat.
    #[default]
    Available,

    /// Provisionally held by an in-flight booking.
    Locked,

    /// Held by a confirmed booking.
    Booked,
}

impl SeatStatus {
    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "Available",
            SeatStatus::Locked => "Locked",
            SeatStatus::Booked => "Booked",
        }
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A physical seat for one scheduled show.
///
/// Identity is `(show_id, seat_id)`. While `Locked` or `Booked` the record
/// remembers the ticket holding it; only that ticket may confirm or release it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRecord {
    show_id: ShowId,
    seat_id: SeatId,
    price: Money,
    status: SeatStatus,
    holder: Option<TicketId>,
}

impl SeatRecord {
    /// Creates an available seat record.
    pub fn new(show_id: ShowId, seat_id: SeatId, price: Money) -> Self {
        Self {
            show_id,
            seat_id,
            price,
            status: SeatStatus::Available,
            holder: None,
        }
    }

    pub fn show_id(&self) -> ShowId {
        self.show_id
    }

    pub fn seat_id(&self) -> &SeatId {
        &self.seat_id
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn status(&self) -> SeatStatus {
        self.status
    }

    /// Returns the ticket currently holding the seat, if any.
    pub fn holder(&self) -> Option<TicketId> {
        self.holder
    }

    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }

    /// Available → Locked on behalf of `holder`.
    pub fn lock(&mut self, holder: TicketId) -> Result<(), DomainError> {
        if self.status != SeatStatus::Available {
            return Err(self.invalid("lock"));
        }
        self.status = SeatStatus::Locked;
        self.holder = Some(holder);
        Ok(())
    }

    /// Locked → Booked. The seat must be locked by `holder`.
    pub fn confirm(&mut self, holder: TicketId) -> Result<(), DomainError> {
        if self.status != SeatStatus::Locked {
            return Err(self.invalid("confirm"));
        }
        if self.holder != Some(holder) {
            return Err(DomainError::NotSeatHolder {
                seat_id: self.seat_id.clone(),
            });
        }
        self.status = SeatStatus::Booked;
        Ok(())
    }

    /// Locked/Booked → Available if held by `holder`.
    ///
    /// Returns `false` without touching the record when the seat is already
    /// available or held by a different ticket.
    pub fn release(&mut self, holder: TicketId) -> bool {
        if self.status == SeatStatus::Available || self.holder != Some(holder) {
            return false;
        }
        self.status = SeatStatus::Available;
        self.holder = None;
        true
    }

    fn invalid(&self, action: &'static str) -> DomainError {
        DomainError::InvalidTransition {
            entity: "seat",
            current_state: self.status.to_string(),
            action,
        }
    }
}
