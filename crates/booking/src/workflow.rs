//! Booking workflow: the book and cancel sagas plus payment maintenance.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{Money, SeatId, ShowId, TicketId, TransactionId, UserId};
use domain::{
    BookingTicket, PaymentEntry, PaymentMethod, PaymentStatus, SeatRecord, TicketStatus,
    normalize_seats,
};
use serde::Serialize;

use crate::attempt::BookingAttempt;
use crate::config::BookingConfig;
use crate::error::BookingError;
use crate::retry::retry_with_backoff;
use crate::services::{
    Catalog, GatewayOutcome, GatewayStatus, LockOutcome, PaymentGateway, PaymentLedger,
    SeatInventory, ShowInfo, TicketRepository, UserDirectory,
};
use crate::state::BookingState;
use crate::steps;

/// The collaborators a [`BookingWorkflow`] drives.
#[derive(Clone)]
pub struct BookingServices {
    pub inventory: Arc<dyn SeatInventory>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub ledger: Arc<dyn PaymentLedger>,
    pub tickets: Arc<dyn TicketRepository>,
    pub catalog: Arc<dyn Catalog>,
    pub users: Arc<dyn UserDirectory>,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancellationReceipt {
    pub ticket: BookingTicket,
    /// Refund rate applied, in basis points.
    pub refund_bps: u32,
    /// The completed refund entry; absent when the refund rate was zero.
    pub refund: Option<PaymentEntry>,
}

/// Orchestrates bookings and cancellations.
///
/// A booking runs as a saga (lock seats → create ticket → charge → confirm
/// seats). If any step after the lock fails, completed steps are undone in
/// reverse order and the original error is returned, so a failed booking
/// leaves no locked seats, no pending ticket and no unrefunded charge.
pub struct BookingWorkflow {
    config: BookingConfig,
    inventory: Arc<dyn SeatInventory>,
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn PaymentLedger>,
    tickets: Arc<dyn TicketRepository>,
    catalog: Arc<dyn Catalog>,
    users: Arc<dyn UserDirectory>,
}

impl BookingWorkflow {
    /// Creates a new booking workflow.
    pub fn new(config: BookingConfig, services: BookingServices) -> Self {
        Self {
            config,
            inventory: services.inventory,
            gateway: services.gateway,
            ledger: services.ledger,
            tickets: services.tickets,
            catalog: services.catalog,
            users: services.users,
        }
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Creates seat records for a catalog show. Returns false if the show was
    /// already scheduled.
    #[tracing::instrument(skip(self))]
    pub async fn schedule_show(&self, show_id: ShowId) -> Result<bool, BookingError> {
        self.catalog
            .get_show(show_id)
            .await?
            .ok_or(BookingError::ShowNotFound(show_id))?;

        let seats: Vec<(SeatId, Money)> = self
            .catalog
            .get_seats_for_show(show_id)
            .await?
            .into_iter()
            .map(|seat| (seat.seat_id, seat.price))
            .collect();
        let seat_count = seats.len();

        let created = self.inventory.schedule_show(show_id, seats).await?;
        if created {
            tracing::info!(%show_id, seat_count, "show scheduled");
        }
        Ok(created)
    }

    /// Books `seat_ids` for `user_id`, charging the priced total.
    ///
    /// Either every seat ends up booked under a confirmed ticket, or the
    /// attempt is fully compensated and the error returned.
    #[tracing::instrument(skip(self, seat_ids), fields(seats = seat_ids.len()))]
    pub async fn book(
        &self,
        user_id: UserId,
        show_id: ShowId,
        seat_ids: Vec<SeatId>,
        method: PaymentMethod,
    ) -> Result<BookingTicket, BookingError> {
        metrics::counter!("bookings_attempted_total").increment(1);
        let started = Instant::now();

        let result = self.execute_booking(user_id, show_id, seat_ids, method).await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("booking_duration_seconds").record(duration);
        match &result {
            Ok(ticket) => {
                metrics::counter!("bookings_confirmed_total").increment(1);
                tracing::info!(
                    ticket_id = %ticket.id(),
                    total = %ticket.total_cost(),
                    duration,
                    "booking confirmed"
                );
            }
            Err(err) => {
                metrics::counter!("bookings_failed_total", "reason" => err.kind()).increment(1);
                report_failure("book", err);
            }
        }
        result
    }

    async fn execute_booking(
        &self,
        user_id: UserId,
        show_id: ShowId,
        seat_ids: Vec<SeatId>,
        method: PaymentMethod,
    ) -> Result<BookingTicket, BookingError> {
        let seat_ids = normalize_seats(seat_ids)?;
        self.users
            .get_user(user_id)
            .await?
            .ok_or(BookingError::UserNotFound(user_id))?;
        self.catalog
            .get_show(show_id)
            .await?
            .ok_or(BookingError::ShowNotFound(show_id))?;
        self.ensure_scheduled(show_id).await?;

        let mut attempt = BookingAttempt::new(TicketId::new(), user_id, show_id, seat_ids);

        // Step 1: Lock seats. A refusal here has nothing to undo.
        tracing::info!(step = steps::STEP_LOCK_SEATS, ticket_id = %attempt.ticket_id(), "saga step started");
        let seats = match self
            .inventory
            .try_lock_all(show_id, attempt.seat_ids(), attempt.ticket_id())
            .await?
        {
            LockOutcome::Locked(seats) => seats,
            LockOutcome::Unavailable(seat_id) => {
                return Err(BookingError::SeatsUnavailable { show_id, seat_id });
            }
        };
        attempt.complete_step(steps::STEP_LOCK_SEATS);
        attempt.transition(BookingState::SeatsLocked)?;

        let result = match self.settle(&mut attempt, &seats, method).await {
            Ok(ticket) => Ok(ticket),
            Err(err) => {
                attempt.fail(err.to_string());
                match self.compensate(&mut attempt).await {
                    Ok(()) => Err(err),
                    Err(compensation) => Err(compensation),
                }
            }
        };

        // The charge stays reserved for this attempt until it is settled or compensated.
        if let Some(transaction_id) = attempt.payment() {
            self.release_payment(transaction_id).await;
        }
        result
    }

    /// Steps 2-4, run while the seats are locked.
    async fn settle(
        &self,
        attempt: &mut BookingAttempt,
        seats: &[SeatRecord],
        method: PaymentMethod,
    ) -> Result<BookingTicket, BookingError> {
        let prices: Vec<Money> = seats.iter().map(SeatRecord::price).collect();
        let total = self.config.pricing.compute_total(&prices)?;
        attempt.set_total(total);

        // Step 2: Create the pending ticket
        let mut ticket = BookingTicket::pending(
            attempt.ticket_id(),
            attempt.user_id(),
            attempt.show_id(),
            attempt.seat_ids().to_vec(),
            total,
        )?;
        self.tickets.insert(ticket.clone()).await?;
        attempt.complete_step(steps::STEP_CREATE_TICKET);

        // Step 3: Charge the customer
        tracing::info!(step = steps::STEP_CHARGE_PAYMENT, amount = %total, %method, "saga step started");
        let entry = PaymentEntry::charge(attempt.user_id(), attempt.ticket_id(), total, method)?;
        let transaction_id = entry.transaction_id().clone();
        self.ledger.record_in_flight(entry).await?;
        attempt.set_payment(transaction_id.clone());
        attempt.transition(BookingState::PaymentPending)?;

        let outcome = self
            .call_gateway("charge", self.gateway.charge(attempt.user_id(), total, method))
            .await;
        let gateway_ref = match outcome {
            GatewayOutcome::Success { gateway_ref } => gateway_ref,
            GatewayOutcome::Declined { reason } => {
                self.ledger
                    .transition(&transaction_id, PaymentStatus::Failed, None, Some(reason.clone()))
                    .await?;
                return Err(BookingError::PaymentDeclined { reason });
            }
            GatewayOutcome::Error { reason } => {
                self.ledger
                    .transition(&transaction_id, PaymentStatus::Failed, None, Some(reason.clone()))
                    .await?;
                return Err(BookingError::PaymentGateway { reason });
            }
        };
        attempt.set_charge_reference(gateway_ref.clone());
        attempt.complete_step(steps::STEP_CHARGE_PAYMENT);
        self.ledger
            .transition(&transaction_id, PaymentStatus::Success, Some(gateway_ref), None)
            .await?;

        // Step 4: Book the seats and confirm the ticket
        self.inventory
            .confirm(attempt.show_id(), attempt.seat_ids(), attempt.ticket_id())
            .await?;
        attempt.complete_step(steps::STEP_CONFIRM_SEATS);

        ticket.confirm(transaction_id)?;
        self.tickets.update(ticket.clone()).await?;
        attempt.transition(BookingState::Confirmed)?;

        Ok(ticket)
    }

    /// Undoes completed steps in reverse order.
    ///
    /// Every undo action is attempted even if an earlier one fails; any
    /// failure left after retries is escalated as `CompensationFailed`.
    #[tracing::instrument(skip(self, attempt), fields(ticket_id = %attempt.ticket_id()))]
    async fn compensate(&self, attempt: &mut BookingAttempt) -> Result<(), BookingError> {
        attempt.transition(BookingState::Compensating)?;
        metrics::counter!("booking_compensations_total").increment(1);
        tracing::warn!(
            reason = attempt.failure_reason().unwrap_or("unknown"),
            completed = ?attempt.completed_steps(),
            "compensating booking attempt"
        );

        let mut failures = Vec::new();
        let completed: Vec<&'static str> = attempt.completed_steps().to_vec();
        for step in completed.iter().rev() {
            let result = match *step {
                steps::STEP_CHARGE_PAYMENT => self.refund_charge(attempt).await,
                steps::STEP_CREATE_TICKET => self.void_ticket(attempt.ticket_id()).await,
                steps::STEP_LOCK_SEATS => self
                    .release_seats(attempt.show_id(), attempt.seat_ids(), attempt.ticket_id())
                    .await
                    .map(|_| ()),
                // Booked seats are freed together with the lock.
                _ => Ok(()),
            };
            if let Err(err) = result {
                tracing::error!(step = *step, error = %err, "compensation step failed");
                failures.push(format!("{step}: {err}"));
            }
        }

        if let Some(transaction_id) = attempt.payment() {
            if let Err(err) = self.close_pending_charge(transaction_id).await {
                tracing::error!(%transaction_id, error = %err, "could not close pending charge");
                failures.push(format!("close charge: {err}"));
            }
        }

        if !failures.is_empty() {
            return Err(BookingError::CompensationFailed {
                ticket_id: attempt.ticket_id(),
                reason: format!(
                    "{} (after: {})",
                    failures.join("; "),
                    attempt.failure_reason().unwrap_or("unknown")
                ),
            });
        }

        attempt.transition(BookingState::Void)?;
        tracing::info!("booking attempt voided");
        Ok(())
    }

    /// Refunds the full charge of a compensated attempt, if it was charged.
    async fn refund_charge(&self, attempt: &BookingAttempt) -> Result<(), BookingError> {
        let (Some(transaction_id), Some(gateway_ref), Some(amount)) = (
            attempt.payment(),
            attempt.charge_reference(),
            attempt.total(),
        ) else {
            return Ok(());
        };
        let ticket_id = attempt.ticket_id();

        retry_with_backoff(&self.config.compensation_retry, move || {
            self.refund_in_full(ticket_id, transaction_id, gateway_ref, amount)
        })
        .await
    }

    async fn refund_in_full(
        &self,
        ticket_id: TicketId,
        transaction_id: &TransactionId,
        gateway_ref: &str,
        amount: Money,
    ) -> Result<(), BookingError> {
        let original = self
            .ledger
            .find_by_transaction_id(transaction_id)
            .await?
            .filter(|entry| entry.status() == PaymentStatus::Success);

        let Some(original) = original else {
            // The ledger never recorded the success; reverse at the gateway only.
            return match self
                .call_gateway("refund", self.gateway.refund(gateway_ref, amount))
                .await
            {
                GatewayOutcome::Success { .. } => Ok(()),
                GatewayOutcome::Declined { reason } | GatewayOutcome::Error { reason } => {
                    Err(BookingError::RefundFailed { ticket_id, reason })
                }
            };
        };

        let already_refunded = self
            .ledger
            .find_by_ticket(ticket_id)
            .await?
            .iter()
            .any(|e| e.original() == Some(transaction_id) && e.status() == PaymentStatus::Refunded);
        if already_refunded {
            return Ok(());
        }

        let refund = PaymentEntry::refund_of(&original, amount)?;
        let refund_id = refund.transaction_id().clone();
        self.ledger.record_in_flight(refund).await?;
        let result = self
            .settle_refund(ticket_id, &refund_id, gateway_ref, amount)
            .await;
        self.release_payment(&refund_id).await;
        result.map(|_| ())
    }

    /// Calls the gateway for a recorded pending refund and records the outcome.
    async fn settle_refund(
        &self,
        ticket_id: TicketId,
        refund_id: &TransactionId,
        original_ref: &str,
        amount: Money,
    ) -> Result<PaymentEntry, BookingError> {
        match self
            .call_gateway("refund", self.gateway.refund(original_ref, amount))
            .await
        {
            GatewayOutcome::Success { gateway_ref } => {
                self.ledger
                    .transition(refund_id, PaymentStatus::Refunded, Some(gateway_ref), None)
                    .await
            }
            GatewayOutcome::Declined { reason } | GatewayOutcome::Error { reason } => {
                self.ledger
                    .transition(refund_id, PaymentStatus::Failed, None, Some(reason.clone()))
                    .await?;
                metrics::counter!("refunds_failed_total").increment(1);
                Err(BookingError::RefundFailed { ticket_id, reason })
            }
        }
    }

    async fn void_ticket(&self, ticket_id: TicketId) -> Result<(), BookingError> {
        retry_with_backoff(&self.config.compensation_retry, move || async move {
            let Some(mut ticket) = self.tickets.get(ticket_id).await? else {
                return Ok(());
            };
            if ticket.status() == TicketStatus::Void {
                return Ok(());
            }
            ticket.void()?;
            self.tickets.update(ticket).await
        })
        .await
    }

    async fn release_seats(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: TicketId,
    ) -> Result<usize, BookingError> {
        let inventory = &self.inventory;
        retry_with_backoff(&self.config.compensation_retry, move || {
            inventory.release(show_id, seat_ids, holder)
        })
        .await
    }

    /// Hands a ledger entry back to `verify_payment` and `cancel_pending_payment`.
    async fn release_payment(&self, transaction_id: &TransactionId) {
        let ledger = &self.ledger;
        let released = retry_with_backoff(&self.config.compensation_retry, move || {
            ledger.clear_in_flight(transaction_id)
        })
        .await;
        if let Err(err) = released {
            tracing::error!(%transaction_id, error = %err, "could not release ledger entry");
        }
    }

    async fn close_pending_charge(&self, transaction_id: &TransactionId) -> Result<(), BookingError> {
        retry_with_backoff(&self.config.compensation_retry, move || async move {
            let pending = self
                .ledger
                .find_by_transaction_id(transaction_id)
                .await?
                .is_some_and(|entry| entry.status() == PaymentStatus::Pending);
            if pending {
                self.ledger
                    .transition(
                        transaction_id,
                        PaymentStatus::Cancelled,
                        None,
                        Some("booking attempt voided".to_string()),
                    )
                    .await?;
            }
            Ok(())
        })
        .await
    }

    /// Cancels a confirmed ticket, refunding according to the cancellation policy.
    ///
    /// If the refund fails the ticket stays confirmed and its seats stay booked.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, ticket_id: TicketId) -> Result<CancellationReceipt, BookingError> {
        let result = self.execute_cancellation(ticket_id).await;
        match &result {
            Ok(receipt) => {
                metrics::counter!("cancellations_total").increment(1);
                tracing::info!(
                    %ticket_id,
                    refund_bps = receipt.refund_bps,
                    refunded = receipt.refund.is_some(),
                    "ticket cancelled"
                );
            }
            Err(err) => report_failure("cancel", err),
        }
        result
    }

    async fn execute_cancellation(
        &self,
        ticket_id: TicketId,
    ) -> Result<CancellationReceipt, BookingError> {
        let mut ticket = self
            .tickets
            .get(ticket_id)
            .await?
            .ok_or(BookingError::TicketNotFound(ticket_id))?;
        if !ticket.status().can_cancel() {
            return Err(BookingError::NotCancellable {
                ticket_id,
                reason: format!("ticket is {}", ticket.status()),
            });
        }

        let show = self
            .catalog
            .get_show(ticket.show_id())
            .await?
            .ok_or(BookingError::ShowNotFound(ticket.show_id()))?;
        let notice = show.starts_at - Utc::now();
        let quote = self
            .config
            .cancellation
            .quote(ticket.total_cost(), notice)
            .ok_or_else(|| BookingError::NotCancellable {
                ticket_id,
                reason: format!(
                    "show starts within the {} minute cancellation cutoff",
                    self.config.cancellation.cutoff().num_minutes()
                ),
            })?;

        let refund = if quote.amount.is_positive() {
            Some(self.refund_ticket(&ticket, quote.amount).await?)
        } else {
            None
        };

        // The refund is settled; the rest must not be abandoned.
        self.release_seats(ticket.show_id(), ticket.seat_ids(), ticket_id)
            .await
            .map_err(|err| BookingError::CompensationFailed {
                ticket_id,
                reason: format!("refund settled but seats could not be released: {err}"),
            })?;
        ticket.cancel()?;
        let tickets = &self.tickets;
        let cancelled = &ticket;
        retry_with_backoff(&self.config.compensation_retry, move || {
            tickets.update(cancelled.clone())
        })
        .await
        .map_err(|err| BookingError::CompensationFailed {
            ticket_id,
            reason: format!("seats released but ticket could not be cancelled: {err}"),
        })?;

        Ok(CancellationReceipt {
            ticket,
            refund_bps: quote.refund_bps,
            refund,
        })
    }

    async fn refund_ticket(
        &self,
        ticket: &BookingTicket,
        amount: Money,
    ) -> Result<PaymentEntry, BookingError> {
        let ticket_id = ticket.id();
        let payment_ref = ticket.payment_ref().ok_or_else(|| {
            BookingError::InvalidState(format!("confirmed ticket {ticket_id} has no payment"))
        })?;
        let original = self
            .ledger
            .find_by_transaction_id(payment_ref)
            .await?
            .ok_or_else(|| BookingError::PaymentNotFound(payment_ref.clone()))?;
        let original_ref = original
            .gateway_reference()
            .ok_or_else(|| {
                BookingError::InvalidState(format!(
                    "payment {payment_ref} has no gateway reference"
                ))
            })?
            .to_string();

        let refund = PaymentEntry::refund_of(&original, amount)?;
        let refund_id = refund.transaction_id().clone();
        self.ledger.record_in_flight(refund).await.map_err(|err| match err {
            BookingError::RefundAlreadyIssued(_) => BookingError::NotCancellable {
                ticket_id,
                reason: "a refund is already in progress or completed".to_string(),
            },
            other => other,
        })?;

        let result = self
            .settle_refund(ticket_id, &refund_id, &original_ref, amount)
            .await;
        self.release_payment(&refund_id).await;
        result
    }

    /// Reconciles a pending ledger entry with the gateway.
    ///
    /// Terminal entries, and entries a booking or cancellation is still
    /// settling, are returned unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn verify_payment(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<PaymentEntry, BookingError> {
        // Checked before the read: once released, an entry only changes here.
        let in_flight = self.ledger.is_in_flight(transaction_id).await?;
        let entry = self
            .ledger
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| BookingError::PaymentNotFound(transaction_id.clone()))?;
        if entry.status().is_terminal() {
            return Ok(entry);
        }
        if in_flight {
            tracing::debug!(%transaction_id, "payment still in flight, skipping verification");
            return Ok(entry);
        }

        let status = tokio::time::timeout(
            self.config.gateway_timeout,
            self.gateway.verify_status(transaction_id),
        )
        .await
        .map_err(|_| BookingError::PaymentGateway {
            reason: "gateway verify timed out".to_string(),
        })??;

        match status {
            GatewayStatus::Pending => Ok(entry),
            GatewayStatus::Success => {
                let settled = if entry.is_refund() {
                    PaymentStatus::Refunded
                } else {
                    PaymentStatus::Success
                };
                self.ledger
                    .transition_if_idle(transaction_id, settled, None, None)
                    .await
            }
            GatewayStatus::Failed => {
                self.ledger
                    .transition_if_idle(
                        transaction_id,
                        PaymentStatus::Failed,
                        None,
                        Some("reported failed by gateway".to_string()),
                    )
                    .await
            }
        }
    }

    /// Cancels a payment that is still pending.
    ///
    /// Fails with `PaymentInFlight` while a booking or cancellation owns the entry.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_pending_payment(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<PaymentEntry, BookingError> {
        let entry = self
            .ledger
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| BookingError::PaymentNotFound(transaction_id.clone()))?;
        if entry.status() != PaymentStatus::Pending {
            return Err(BookingError::InvalidState(format!(
                "payment {transaction_id} is {}; only pending payments can be cancelled",
                entry.status()
            )));
        }

        self.ledger
            .transition_if_idle(
                transaction_id,
                PaymentStatus::Cancelled,
                None,
                Some("cancelled by user".to_string()),
            )
            .await
    }

    async fn ensure_scheduled(&self, show_id: ShowId) -> Result<(), BookingError> {
        if !self.inventory.is_scheduled(show_id).await? {
            self.schedule_show(show_id).await?;
        }
        Ok(())
    }
}

// Query methods
impl BookingWorkflow {
    pub async fn get_ticket(&self, ticket_id: TicketId) -> Result<BookingTicket, BookingError> {
        self.tickets
            .get(ticket_id)
            .await?
            .ok_or(BookingError::TicketNotFound(ticket_id))
    }

    pub async fn tickets_for_user(&self, user_id: UserId) -> Result<Vec<BookingTicket>, BookingError> {
        self.tickets.find_by_user(user_id).await
    }

    pub async fn get_show(&self, show_id: ShowId) -> Result<ShowInfo, BookingError> {
        self.catalog
            .get_show(show_id)
            .await?
            .ok_or(BookingError::ShowNotFound(show_id))
    }

    /// Current seat records of a show, scheduling it first if needed.
    pub async fn seat_map(&self, show_id: ShowId) -> Result<Vec<SeatRecord>, BookingError> {
        self.get_show(show_id).await?;
        self.ensure_scheduled(show_id).await?;
        self.inventory.seats(show_id).await
    }

    pub async fn find_payment(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<PaymentEntry, BookingError> {
        self.ledger
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| BookingError::PaymentNotFound(transaction_id.clone()))
    }

    pub async fn payments_for_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Result<Vec<PaymentEntry>, BookingError> {
        self.ledger.find_by_ticket(ticket_id).await
    }

    pub async fn payments_for_user(&self, user_id: UserId) -> Result<Vec<PaymentEntry>, BookingError> {
        self.ledger.find_by_user(user_id).await
    }

    pub async fn payments_with_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<PaymentEntry>, BookingError> {
        self.ledger.find_by_status(status).await
    }

    /// Successful charges minus completed refunds created in `[from, to)`.
    pub async fn settled_revenue(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Money, BookingError> {
        self.ledger.settled_revenue(from, to).await
    }

    /// Runs a gateway call under the configured timeout. A timeout is
    /// reported as a gateway error.
    async fn call_gateway<F>(&self, operation: &'static str, call: F) -> GatewayOutcome
    where
        F: Future<Output = GatewayOutcome>,
    {
        match tokio::time::timeout(self.config.gateway_timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let timeout_ms = self.config.gateway_timeout.as_millis() as u64;
                tracing::warn!(operation, timeout_ms, "gateway call timed out");
                GatewayOutcome::Error {
                    reason: format!("gateway {operation} timed out after {timeout_ms}ms"),
                }
            }
        }
    }
}

fn report_failure(operation: &'static str, err: &BookingError) {
    if err.is_defect() {
        metrics::counter!("booking_defects_total", "operation" => operation).increment(1);
        tracing::error!(operation, error = %err, "booking defect");
    } else {
        tracing::warn!(operation, error = %err, "request rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        CatalogSeat, InMemoryCatalog, InMemoryPaymentGateway, InMemoryPaymentLedger,
        InMemorySeatInventory, InMemoryTicketRepository, InMemoryUserDirectory, User,
    };
    use domain::SeatStatus;

    struct Fixture {
        workflow: BookingWorkflow,
        gateway: InMemoryPaymentGateway,
        user_id: UserId,
        show_id: ShowId,
    }

    async fn setup() -> Fixture {
        let catalog = InMemoryCatalog::new();
        let users = InMemoryUserDirectory::new();
        let gateway = InMemoryPaymentGateway::new();

        let show_id = ShowId::new();
        catalog
            .add_show(
                ShowInfo {
                    id: show_id,
                    title: "Arrival".to_string(),
                    auditorium: "Screen 2".to_string(),
                    starts_at: Utc::now() + chrono::Duration::hours(48),
                },
                vec![
                    CatalogSeat {
                        seat_id: SeatId::new("A1"),
                        price: Money::from_units(100),
                    },
                    CatalogSeat {
                        seat_id: SeatId::new("A2"),
                        price: Money::from_units(150),
                    },
                ],
            )
            .await;
        let user_id = UserId::new();
        users
            .add_user(User {
                id: user_id,
                name: "Ravi".to_string(),
                email: "ravi@example.com".to_string(),
            })
            .await;

        let workflow = BookingWorkflow::new(
            BookingConfig::default(),
            BookingServices {
                inventory: Arc::new(InMemorySeatInventory::new()),
                gateway: Arc::new(gateway.clone()),
                ledger: Arc::new(InMemoryPaymentLedger::new()),
                tickets: Arc::new(InMemoryTicketRepository::new()),
                catalog: Arc::new(catalog),
                users: Arc::new(users),
            },
        );

        Fixture {
            workflow,
            gateway,
            user_id,
            show_id,
        }
    }

    fn seats() -> Vec<SeatId> {
        vec![SeatId::new("A2"), SeatId::new("A1")]
    }

    #[tokio::test]
    async fn test_happy_path() {
        let f = setup().await;

        let ticket = f
            .workflow
            .book(f.user_id, f.show_id, seats(), PaymentMethod::CreditCard)
            .await
            .unwrap();

        assert_eq!(ticket.status(), TicketStatus::Confirmed);
        assert_eq!(ticket.total_cost(), Money::from_cents(31750));
        assert!(ticket.payment_ref().is_some());

        let map = f.workflow.seat_map(f.show_id).await.unwrap();
        assert!(map.iter().all(|s| s.status() == SeatStatus::Booked));
        assert!(map.iter().all(|s| s.holder() == Some(ticket.id())));

        let payment = f
            .workflow
            .find_payment(ticket.payment_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(payment.status(), PaymentStatus::Success);
        assert_eq!(f.gateway.charges().len(), 1);
    }

    #[tokio::test]
    async fn test_payment_declined_is_compensated() {
        let f = setup().await;
        f.gateway.decline_charges("insufficient funds");

        let err = f
            .workflow
            .book(f.user_id, f.show_id, seats(), PaymentMethod::Upi)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::PaymentDeclined { .. }));

        let map = f.workflow.seat_map(f.show_id).await.unwrap();
        assert!(map.iter().all(|s| s.is_available()));

        let tickets = f.workflow.tickets_for_user(f.user_id).await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].status(), TicketStatus::Void);
    }

    #[tokio::test]
    async fn test_unknown_user_and_show() {
        let f = setup().await;

        let err = f
            .workflow
            .book(UserId::new(), f.show_id, seats(), PaymentMethod::Upi)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::UserNotFound(_)));

        let err = f
            .workflow
            .book(f.user_id, ShowId::new(), seats(), PaymentMethod::Upi)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ShowNotFound(_)));
        assert_eq!(f.gateway.charge_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_and_duplicate_seat_requests() {
        let f = setup().await;

        let err = f
            .workflow
            .book(f.user_id, f.show_id, vec![], PaymentMethod::Upi)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidRequest(_)));

        let err = f
            .workflow
            .book(
                f.user_id,
                f.show_id,
                vec![SeatId::new("A1"), SeatId::new("A1")],
                PaymentMethod::Upi,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_schedule_show_is_idempotent() {
        let f = setup().await;
        assert!(f.workflow.schedule_show(f.show_id).await.unwrap());
        assert!(!f.workflow.schedule_show(f.show_id).await.unwrap());
        assert!(matches!(
            f.workflow.schedule_show(ShowId::new()).await,
            Err(BookingError::ShowNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_with_full_tier_refund() {
        let f = setup().await;
        let ticket = f
            .workflow
            .book(f.user_id, f.show_id, seats(), PaymentMethod::Wallet)
            .await
            .unwrap();

        let receipt = f.workflow.cancel(ticket.id()).await.unwrap();
        assert_eq!(receipt.ticket.status(), TicketStatus::Cancelled);
        assert_eq!(receipt.refund_bps, 9_000);

        let refund = receipt.refund.unwrap();
        assert_eq!(refund.status(), PaymentStatus::Refunded);
        assert_eq!(refund.amount(), Money::from_cents(-28575));
        assert_eq!(refund.original(), ticket.payment_ref());
    }
}
