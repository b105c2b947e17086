//! In-flight booking attempt.

use common::{Money, SeatId, ShowId, TicketId, TransactionId, UserId};

use crate::error::BookingError;
use crate::state::BookingState;

/// Tracks one execution of the booking saga.
///
/// Records which steps completed and the context each produced (charge
/// transaction, gateway reference) so compensation can undo them in reverse.
#[derive(Debug, Clone)]
pub struct BookingAttempt {
    ticket_id: TicketId,
    user_id: UserId,
    show_id: ShowId,
    seat_ids: Vec<SeatId>,
    state: BookingState,
    completed_steps: Vec<&'static str>,
    total: Option<Money>,
    /// Ledger entry of the charge, once recorded.
    payment: Option<TransactionId>,
    /// Gateway reference of a successful charge.
    charge_reference: Option<String>,
    failure_reason: Option<String>,
}

impl BookingAttempt {
    /// Starts an attempt. `seat_ids` must already be normalized.
    pub fn new(ticket_id: TicketId, user_id: UserId, show_id: ShowId, seat_ids: Vec<SeatId>) -> Self {
        Self {
            ticket_id,
            user_id,
            show_id,
            seat_ids,
            state: BookingState::Start,
            completed_steps: Vec::new(),
            total: None,
            payment: None,
            charge_reference: None,
            failure_reason: None,
        }
    }

    /// Moves the attempt to `next`, rejecting illegal edges.
    pub fn transition(&mut self, next: BookingState) -> Result<(), BookingError> {
        if !self.state.can_transition_to(next) {
            return Err(BookingError::InvalidState(format!(
                "booking attempt {} cannot move from {} to {}",
                self.ticket_id, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    pub fn complete_step(&mut self, step: &'static str) {
        self.completed_steps.push(step);
    }

    pub fn set_total(&mut self, total: Money) {
        self.total = Some(total);
    }

    pub fn set_payment(&mut self, transaction_id: TransactionId) {
        self.payment = Some(transaction_id);
    }

    pub fn set_charge_reference(&mut self, reference: String) {
        self.charge_reference = Some(reference);
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.failure_reason = Some(reason.into());
    }
}

// Query methods
impl BookingAttempt {
    pub fn ticket_id(&self) -> TicketId {
        self.ticket_id
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

    pub fn state(&self) -> BookingState {
        self.state
    }

    /// Returns the names of completed steps in execution order.
    pub fn completed_steps(&self) -> &[&'static str] {
        &self.completed_steps
    }

    pub fn total(&self) -> Option<Money> {
        self.total
    }

    pub fn payment(&self) -> Option<&TransactionId> {
        self.payment.as_ref()
    }

    pub fn charge_reference(&self) -> Option<&str> {
        self.charge_reference.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps;

    fn attempt() -> BookingAttempt {
        BookingAttempt::new(
            TicketId::new(),
            UserId::new(),
            ShowId::new(),
            vec![SeatId::new("A1")],
        )
    }

    #[test]
    fn test_new_attempt() {
        let attempt = attempt();
        assert_eq!(attempt.state(), BookingState::Start);
        assert!(attempt.completed_steps().is_empty());
        assert!(attempt.payment().is_none());
        assert!(attempt.failure_reason().is_none());
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let mut attempt = attempt();

        attempt.transition(BookingState::SeatsLocked).unwrap();
        attempt.complete_step(steps::STEP_LOCK_SEATS);
        attempt.complete_step(steps::STEP_CREATE_TICKET);
        attempt.set_payment(TransactionId::new("TXN-1"));
        attempt.transition(BookingState::PaymentPending).unwrap();
        attempt.set_charge_reference("GW-1".to_string());
        attempt.complete_step(steps::STEP_CHARGE_PAYMENT);
        attempt.transition(BookingState::Confirmed).unwrap();

        assert_eq!(attempt.state(), BookingState::Confirmed);
        assert_eq!(
            attempt.completed_steps(),
            &["lock_seats", "create_ticket", "charge_payment"]
        );
        assert_eq!(attempt.charge_reference(), Some("GW-1"));
    }

    #[test]
    fn test_compensation_lifecycle() {
        let mut attempt = attempt();
        attempt.transition(BookingState::SeatsLocked).unwrap();
        attempt.fail("Payment declined: insufficient funds");
        attempt.transition(BookingState::Compensating).unwrap();
        attempt.transition(BookingState::Void).unwrap();

        assert_eq!(attempt.state(), BookingState::Void);
        assert_eq!(
            attempt.failure_reason(),
            Some("Payment declined: insufficient funds")
        );
    }

    #[test]
    fn test_illegal_transition_is_rejected() {
        let mut attempt = attempt();
        let err = attempt.transition(BookingState::Confirmed).unwrap_err();
        assert!(matches!(err, BookingError::InvalidState(_)));
        assert_eq!(attempt.state(), BookingState::Start);
    }
}
