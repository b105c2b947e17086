//! Payment ledger entries.

use chrono::{DateTime, Utc};
use common::{Money, TicketId, TransactionId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Status of a payment or refund attempt.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Success    (charges)
///           ├──► Refunded   (refunds)
///           ├──► Failed
///           └──► Cancelled
/// ```
/// Every status other than `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Success => "Success",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Cancelled => "Cancelled",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Upi,
    NetBanking,
    Wallet,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::NetBanking => "net_banking",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single charge or refund recorded in the payment ledger.
///
/// Charges carry a positive amount. Refunds carry a negative amount and link
/// to the charge they reverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEntry {
    transaction_id: TransactionId,
    user_id: UserId,
    ticket_id: TicketId,
    amount: Money,
    method: PaymentMethod,
    status: PaymentStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    gateway_reference: Option<String>,
    failure_reason: Option<String>,
    original: Option<TransactionId>,
}

impl PaymentEntry {
    /// Creates a pending charge. The amount must be positive.
    pub fn charge(
        user_id: UserId,
        ticket_id: TicketId,
        amount: Money,
        method: PaymentMethod,
    ) -> Result<Self, DomainError> {
        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount {
                amount,
                reason: "payment amount must be greater than zero",
            });
        }

        Ok(Self {
            transaction_id: TransactionId::generate(),
            user_id,
            ticket_id,
            amount,
            method,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            gateway_reference: None,
            failure_reason: None,
            original: None,
        })
    }

    /// Creates a pending refund of `amount` against a successful charge.
    ///
    /// The refund is stored with a negative amount whose magnitude may not
    /// exceed the original charge.
    pub fn refund_of(original: &PaymentEntry, amount: Money) -> Result<Self, DomainError> {
        if original.is_refund() {
            return Err(DomainError::InvalidTransition {
                entity: "payment",
                current_state: "refund".to_string(),
                action: "refund a refund",
            });
        }
        if original.status != PaymentStatus::Success {
            return Err(DomainError::InvalidTransition {
                entity: "payment",
                current_state: original.status.to_string(),
                action: "refund",
            });
        }
        if !amount.is_positive() || amount > original.amount {
            return Err(DomainError::InvalidAmount {
                amount,
                reason: "refund must be positive and at most the original amount",
            });
        }

        Ok(Self {
            transaction_id: TransactionId::generate(),
            user_id: original.user_id,
            ticket_id: original.ticket_id,
            amount: amount.negate(),
            method: original.method,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            gateway_reference: None,
            failure_reason: None,
            original: Some(original.transaction_id.clone()),
        })
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn ticket_id(&self) -> TicketId {
        self.ticket_id
    }

    /// Signed amount: positive for charges, negative for refunds.
    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Opaque reference returned by the payment gateway.
    pub fn gateway_reference(&self) -> Option<&str> {
        self.gateway_reference.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// The charge this refund reverses.
    pub fn original(&self) -> Option<&TransactionId> {
        self.original.as_ref()
    }

    pub fn is_refund(&self) -> bool {
        self.original.is_some()
    }

    /// Moves a pending entry to a terminal status exactly once.
    ///
    /// `Success` is only valid for charges and `Refunded` only for refunds.
    pub fn transition(
        &mut self,
        to: PaymentStatus,
        gateway_reference: Option<String>,
        reason: Option<String>,
    ) -> Result<(), DomainError> {
        let action = match to {
            PaymentStatus::Pending => "reopen",
            PaymentStatus::Success => "mark successful",
            PaymentStatus::Failed => "fail",
            PaymentStatus::Cancelled => "cancel",
            PaymentStatus::Refunded => "mark refunded",
        };
        let allowed = match to {
            PaymentStatus::Pending => false,
            PaymentStatus::Success => !self.is_refund(),
            PaymentStatus::Refunded => self.is_refund(),
            PaymentStatus::Failed | PaymentStatus::Cancelled => true,
        };
        if self.status.is_terminal() || !allowed {
            return Err(DomainError::InvalidTransition {
                entity: "payment",
                current_state: self.status.to_string(),
                action,
            });
        }

        self.status = to;
        self.completed_at = Some(Utc::now());
        if gateway_reference.is_some() {
            self.gateway_reference = gateway_reference;
        }
        self.failure_reason = reason;
        Ok(())
    }
}
