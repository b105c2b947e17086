//! Booking tickets.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{Money, SeatId, ShowId, TicketId, TransactionId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The state of a booking ticket in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed ──► Cancelled
///           └──► Void
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TicketStatus {
    /// Seats are locked and payment is in flight.
    #[default]
    Pending,

    /// Paid for; seats are booked.
    Confirmed,

    /// The booking attempt failed and was compensated (terminal state).
    Void,

    /// A confirmed booking was cancelled and refunded (terminal state).
    Cancelled,
}

impl TicketStatus {
    /// Returns true if the ticket can be confirmed in this state.
    pub fn can_confirm(&self) -> bool {
        matches!(self, TicketStatus::Pending)
    }

    /// Returns true if the ticket can be voided in this state.
    pub fn can_void(&self) -> bool {
        matches!(self, TicketStatus::Pending)
    }

    /// Returns true if the ticket can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, TicketStatus::Confirmed)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Void | TicketStatus::Cancelled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "Pending",
            TicketStatus::Confirmed => "Confirmed",
            TicketStatus::Void => "Void",
            TicketStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A booking of one or more seats for a show by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingTicket {
    id: TicketId,
    user_id: UserId,
    show_id: ShowId,
    /// Sorted, unique, non-empty.
    seat_ids: Vec<SeatId>,
    total_cost: Money,
    status: TicketStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    payment_ref: Option<TransactionId>,
}

impl BookingTicket {
    /// Creates a pending ticket.
    ///
    /// Fails if the seat list is empty or has duplicates, or if the total is negative.
    pub fn pending(
        id: TicketId,
        user_id: UserId,
        show_id: ShowId,
        seat_ids: Vec<SeatId>,
        total_cost: Money,
    ) -> Result<Self, DomainError> {
        let seat_ids = normalize_seats(seat_ids)?;
        if total_cost.is_negative() {
            return Err(DomainError::InvalidAmount {
                amount: total_cost,
                reason: "ticket total cannot be negative",
            });
        }

        let now = Utc::now();
        Ok(Self {
            id,
            user_id,
            show_id,
            seat_ids,
            total_cost,
            status: TicketStatus::Pending,
            created_at: now,
            updated_at: now,
            payment_ref: None,
        })
    }

    pub fn id(&self) -> TicketId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn show_id(&self) -> ShowId {
        self.show_id
    }

    pub fn seat_ids(&self) -> &[SeatId] {
        &self.seat_ids
    }

    pub fn total_cost(&self) -> Money {
        self.total_cost
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the ledger transaction that paid for this ticket, once confirmed.
    pub fn payment_ref(&self) -> Option<&TransactionId> {
        self.payment_ref.as_ref()
    }

    /// Pending → Confirmed, linking the successful payment.
    pub fn confirm(&mut self, payment_ref: TransactionId) -> Result<(), DomainError> {
        if !self.status.can_confirm() {
            return Err(self.invalid("confirm"));
        }
        self.status = TicketStatus::Confirmed;
        self.payment_ref = Some(payment_ref);
        self.touch();
        Ok(())
    }

    /// Pending → Void.
    pub fn void(&mut self) -> Result<(), DomainError> {
        if !self.status.can_void() {
            return Err(self.invalid("void"));
        }
        self.status = TicketStatus::Void;
        self.touch();
        Ok(())
    }

    /// Confirmed → Cancelled.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if !self.status.can_cancel() {
            return Err(self.invalid("cancel"));
        }
        self.status = TicketStatus::Cancelled;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn invalid(&self, action: &'static str) -> DomainError {
        DomainError::InvalidTransition {
            entity: "ticket",
            current_state: self.status.to_string(),
            action,
        }
    }
}

/// Sorts seat ids into acquisition order, rejecting empty or duplicated requests.
pub fn normalize_seats(seat_ids: Vec<SeatId>) -> Result<Vec<SeatId>, DomainError> {
    if seat_ids.is_empty() {
        return Err(DomainError::NoSeats);
    }
    let mut unique = BTreeSet::new();
    for seat_id in seat_ids {
        if unique.contains(&seat_id) {
            return Err(DomainError::DuplicateSeat(seat_id));
        }
        unique.insert(seat_id);
    }
    Ok(unique.into_iter().collect())
}
