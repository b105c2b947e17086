//! Payment ledger trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, TicketId, TransactionId, UserId};
use domain::{PaymentEntry, PaymentStatus};
use tokio::sync::RwLock;

use crate::error::BookingError;

/// Durable, append-mostly record of charges and refunds.
///
/// Entries are never deleted. Refund entries are validated against their
/// original charge when recorded: the original must be successful and it may
/// carry at most one refund that is pending or completed.
///
/// An entry recorded with [`record_in_flight`](PaymentLedger::record_in_flight)
/// belongs to the saga waiting on its gateway call until
/// [`clear_in_flight`](PaymentLedger::clear_in_flight). Only the owner may
/// settle it; [`transition_if_idle`](PaymentLedger::transition_if_idle)
/// refuses it with `PaymentInFlight`.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Stores a new entry.
    async fn record(&self, entry: PaymentEntry) -> Result<(), BookingError>;

    /// Stores a new entry owned by the caller until `clear_in_flight`.
    async fn record_in_flight(&self, entry: PaymentEntry) -> Result<(), BookingError>;

    /// Ends ownership of an entry. Unknown or unowned ids are ignored.
    async fn clear_in_flight(&self, transaction_id: &TransactionId) -> Result<(), BookingError>;

    async fn is_in_flight(&self, transaction_id: &TransactionId) -> Result<bool, BookingError>;

    /// Moves a pending entry to a terminal status and returns the updated entry.
    ///
    /// Used by the owner of the entry; does not check ownership.
    async fn transition(
        &self,
        transaction_id: &TransactionId,
        status: PaymentStatus,
        gateway_reference: Option<String>,
        reason: Option<String>,
    ) -> Result<PaymentEntry, BookingError>;

    /// Like `transition`, but fails with `PaymentInFlight` while the entry is owned.
    async fn transition_if_idle(
        &self,
        transaction_id: &TransactionId,
        status: PaymentStatus,
        gateway_reference: Option<String>,
        reason: Option<String>,
    ) -> Result<PaymentEntry, BookingError>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<PaymentEntry>, BookingError>;

    /// All entries for a ticket, oldest first.
    async fn find_by_ticket(&self, ticket_id: TicketId) -> Result<Vec<PaymentEntry>, BookingError>;

    /// All entries for a user, oldest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<PaymentEntry>, BookingError>;

    /// All entries in the given status, oldest first.
    async fn find_by_status(&self, status: PaymentStatus)
    -> Result<Vec<PaymentEntry>, BookingError>;

    /// Entries created in `[from, to)`, oldest first.
    async fn find_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentEntry>, BookingError>;

    /// Money actually retained in `[from, to)`: successful charges minus
    /// completed refunds.
    async fn settled_revenue(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Money, BookingError> {
        let entries = self.find_created_between(from, to).await?;
        Ok(entries
            .iter()
            .filter(|e| {
                matches!(
                    e.status(),
                    PaymentStatus::Success | PaymentStatus::Refunded
                )
            })
            .map(|e| e.amount())
            .sum())
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: HashMap<TransactionId, PaymentEntry>,
    /// Insertion order, for stable query results.
    order: Vec<TransactionId>,
    in_flight: HashSet<TransactionId>,
}

impl LedgerState {
    fn insert(&mut self, entry: PaymentEntry) -> Result<TransactionId, BookingError> {
        if self.entries.contains_key(entry.transaction_id()) {
            return Err(BookingError::InvalidState(format!(
                "duplicate transaction id {}",
                entry.transaction_id()
            )));
        }
        self.check_refund(&entry)?;

        let id = entry.transaction_id().clone();
        self.order.push(id.clone());
        self.entries.insert(id.clone(), entry);
        Ok(id)
    }

    fn apply(
        &mut self,
        transaction_id: &TransactionId,
        status: PaymentStatus,
        gateway_reference: Option<String>,
        reason: Option<String>,
    ) -> Result<PaymentEntry, BookingError> {
        let entry = self
            .entries
            .get_mut(transaction_id)
            .ok_or_else(|| BookingError::PaymentNotFound(transaction_id.clone()))?;

        entry.transition(status, gateway_reference, reason)?;
        Ok(entry.clone())
    }

    fn ordered(&self) -> impl Iterator<Item = &PaymentEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Refunds against `original` that are still in flight or completed.
    fn active_refunds<'a>(
        &'a self,
        original: &'a TransactionId,
    ) -> impl Iterator<Item = &'a PaymentEntry> + 'a {
        self.ordered().filter(move |e| {
            e.original() == Some(original)
                && matches!(
                    e.status(),
                    PaymentStatus::Pending | PaymentStatus::Refunded
                )
        })
    }

    fn check_refund(&self, refund: &PaymentEntry) -> Result<(), BookingError> {
        let Some(original_id) = refund.original() else {
            return Ok(());
        };
        let original = self
            .entries
            .get(original_id)
            .ok_or_else(|| BookingError::PaymentNotFound(original_id.clone()))?;

        if original.status() != PaymentStatus::Success {
            return Err(BookingError::InvalidState(format!(
                "cannot refund payment {} in {} state",
                original_id,
                original.status()
            )));
        }
        if self.active_refunds(original_id).next().is_some() {
            return Err(BookingError::RefundAlreadyIssued(original_id.clone()));
        }
        if refund.amount().abs() > original.amount() {
            return Err(BookingError::InvalidState(format!(
                "refund of {} exceeds original payment of {}",
                refund.amount().abs(),
                original.amount()
            )));
        }
        Ok(())
    }
}

/// In-memory payment ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryPaymentLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded entries.
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    async fn filtered(&self, predicate: impl Fn(&PaymentEntry) -> bool) -> Vec<PaymentEntry> {
        let state = self.state.read().await;
        state.ordered().filter(|e| predicate(*e)).cloned().collect()
    }
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentLedger {
    async fn record(&self, entry: PaymentEntry) -> Result<(), BookingError> {
        self.state.write().await.insert(entry).map(|_| ())
    }

    async fn record_in_flight(&self, entry: PaymentEntry) -> Result<(), BookingError> {
        let mut state = self.state.write().await;
        let id = state.insert(entry)?;
        state.in_flight.insert(id);
        Ok(())
    }

    async fn clear_in_flight(&self, transaction_id: &TransactionId) -> Result<(), BookingError> {
        self.state.write().await.in_flight.remove(transaction_id);
        Ok(())
    }

    async fn is_in_flight(&self, transaction_id: &TransactionId) -> Result<bool, BookingError> {
        Ok(self.state.read().await.in_flight.contains(transaction_id))
    }

    async fn transition(
        &self,
        transaction_id: &TransactionId,
        status: PaymentStatus,
        gateway_reference: Option<String>,
        reason: Option<String>,
    ) -> Result<PaymentEntry, BookingError> {
        self.state
            .write()
            .await
            .apply(transaction_id, status, gateway_reference, reason)
    }

    async fn transition_if_idle(
        &self,
        transaction_id: &TransactionId,
        status: PaymentStatus,
        gateway_reference: Option<String>,
        reason: Option<String>,
    ) -> Result<PaymentEntry, BookingError> {
        let mut state = self.state.write().await;
        if state.in_flight.contains(transaction_id) {
            return Err(BookingError::PaymentInFlight(transaction_id.clone()));
        }
        state.apply(transaction_id, status, gateway_reference, reason)
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<PaymentEntry>, BookingError> {
        Ok(self.state.read().await.entries.get(transaction_id).cloned())
    }

    async fn find_by_ticket(&self, ticket_id: TicketId) -> Result<Vec<PaymentEntry>, BookingError> {
        Ok(self.filtered(|e| e.ticket_id() == ticket_id).await)
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<PaymentEntry>, BookingError> {
        Ok(self.filtered(|e| e.user_id() == user_id).await)
    }

    async fn find_by_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<PaymentEntry>, BookingError> {
        Ok(self.filtered(|e| e.status() == status).await)
    }

    async fn find_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentEntry>, BookingError> {
        Ok(self
            .filtered(|e| e.created_at() >= from && e.created_at() < to)
            .await)
    }
}
