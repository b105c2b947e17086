//! Payment gateway trait and in-memory implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use common::{Money, TransactionId, UserId};
use domain::PaymentMethod;
use serde::{Deserialize, Serialize};

use crate::error::BookingError;

/// Answer from the gateway for a charge or refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Money moved; `gateway_ref` identifies the operation at the gateway.
    Success { gateway_ref: String },
    /// The gateway refused the operation.
    Declined { reason: String },
    /// The gateway could not be reached or answered with an error.
    Error { reason: String },
}

impl GatewayOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GatewayOutcome::Success { .. })
    }
}

/// Gateway view of an earlier transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    Success,
    Failed,
    Pending,
}

/// External payment processor.
///
/// Calls may be slow; callers bound them with a timeout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges `amount` to `payer`.
    async fn charge(&self, payer: UserId, amount: Money, method: PaymentMethod) -> GatewayOutcome;

    /// Refunds `amount` of the charge identified by `original_ref`.
    async fn refund(&self, original_ref: &str, amount: Money) -> GatewayOutcome;

    /// Asks the gateway for the current status of a transaction.
    async fn verify_status(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<GatewayStatus, BookingError>;
}

/// How the in-memory gateway answers a call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScriptedResponse {
    #[default]
    Approve,
    Decline(String),
    Fail(String),
}

/// A charge accepted by the in-memory gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCharge {
    pub gateway_ref: String,
    pub payer: UserId,
    pub amount: Money,
    pub method: PaymentMethod,
}

/// A refund accepted by the in-memory gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRefund {
    pub gateway_ref: String,
    pub original_ref: String,
    pub amount: Money,
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    charges: Vec<RecordedCharge>,
    refunds: Vec<RecordedRefund>,
    charge_calls: usize,
    refund_calls: usize,
    next_id: u32,
    charge_response: ScriptedResponse,
    refund_response: ScriptedResponse,
    queued_charges: VecDeque<ScriptedResponse>,
    queued_refunds: VecDeque<ScriptedResponse>,
    charge_delay: Option<Duration>,
    refund_delay: Option<Duration>,
    verify_answers: HashMap<TransactionId, GatewayStatus>,
    verify_default: Option<GatewayStatus>,
}

/// Deterministic, scriptable gateway for tests.
///
/// Approves everything by default. Responses can be set permanently
/// (`decline_charges`, `fail_refunds`, ...) or queued for the next call only.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a gateway that approves every call.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryGatewayState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryGatewayState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_charge_response(&self, response: ScriptedResponse) {
        self.write().charge_response = response;
    }

    pub fn set_refund_response(&self, response: ScriptedResponse) {
        self.write().refund_response = response;
    }

    /// Declines every charge with `reason`.
    pub fn decline_charges(&self, reason: impl Into<String>) {
        self.set_charge_response(ScriptedResponse::Decline(reason.into()));
    }

    /// Fails every refund with a gateway error.
    pub fn fail_refunds(&self, reason: impl Into<String>) {
        self.set_refund_response(ScriptedResponse::Fail(reason.into()));
    }

    /// Overrides the response of the next charge only.
    pub fn queue_charge_response(&self, response: ScriptedResponse) {
        self.write().queued_charges.push_back(response);
    }

    /// Overrides the response of the next refund only.
    pub fn queue_refund_response(&self, response: ScriptedResponse) {
        self.write().queued_refunds.push_back(response);
    }

    /// Delays every charge before answering.
    pub fn set_charge_delay(&self, delay: Option<Duration>) {
        self.write().charge_delay = delay;
    }

    /// Delays every refund before answering.
    pub fn set_refund_delay(&self, delay: Option<Duration>) {
        self.write().refund_delay = delay;
    }

    /// Scripts the verify answer for one transaction.
    pub fn set_verify_status(&self, transaction_id: TransactionId, status: GatewayStatus) {
        self.write().verify_answers.insert(transaction_id, status);
    }

    /// Scripts the verify answer for transactions without a specific answer.
    /// With no default, verify reports a gateway error.
    pub fn set_default_verify_status(&self, status: Option<GatewayStatus>) {
        self.write().verify_default = status;
    }

    /// Charges that succeeded.
    pub fn charges(&self) -> Vec<RecordedCharge> {
        self.read().charges.clone()
    }

    /// Refunds that succeeded.
    pub fn refunds(&self) -> Vec<RecordedRefund> {
        self.read().refunds.clone()
    }

    /// Number of charge calls, successful or not.
    pub fn charge_calls(&self) -> usize {
        self.read().charge_calls
    }

    /// Number of refund calls, successful or not.
    pub fn refund_calls(&self) -> usize {
        self.read().refund_calls
    }

    /// Net amount the gateway holds: successful charges minus successful refunds.
    pub fn net_collected(&self) -> Money {
        let state = self.read();
        let charged: Money = state.charges.iter().map(|c| c.amount).sum();
        let refunded: Money = state.refunds.iter().map(|r| r.amount).sum();
        charged - refunded
    }

    fn next_ref(state: &mut InMemoryGatewayState, prefix: &str) -> String {
        state.next_id += 1;
        format!("{prefix}-{:04}", state.next_id)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(&self, payer: UserId, amount: Money, method: PaymentMethod) -> GatewayOutcome {
        let delay = self.read().charge_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.write();
        state.charge_calls += 1;
        let queued = state.queued_charges.pop_front();
        let response = queued.unwrap_or_else(|| state.charge_response.clone());

        match response {
            ScriptedResponse::Approve => {
                let gateway_ref = Self::next_ref(&mut state, "GW");
                state.charges.push(RecordedCharge {
                    gateway_ref: gateway_ref.clone(),
                    payer,
                    amount,
                    method,
                });
                GatewayOutcome::Success { gateway_ref }
            }
            ScriptedResponse::Decline(reason) => GatewayOutcome::Declined { reason },
            ScriptedResponse::Fail(reason) => GatewayOutcome::Error { reason },
        }
    }

    async fn refund(&self, original_ref: &str, amount: Money) -> GatewayOutcome {
        let delay = self.read().refund_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.write();
        state.refund_calls += 1;
        let queued = state.queued_refunds.pop_front();
        let response = queued.unwrap_or_else(|| state.refund_response.clone());

        match response {
            ScriptedResponse::Approve => {
                if !state.charges.iter().any(|c| c.gateway_ref == original_ref) {
                    return GatewayOutcome::Declined {
                        reason: format!("unknown charge {original_ref}"),
                    };
                }
                let gateway_ref = Self::next_ref(&mut state, "RF");
                state.refunds.push(RecordedRefund {
                    gateway_ref: gateway_ref.clone(),
                    original_ref: original_ref.to_string(),
                    amount,
                });
                GatewayOutcome::Success { gateway_ref }
            }
            ScriptedResponse::Decline(reason) => GatewayOutcome::Declined { reason },
            ScriptedResponse::Fail(reason) => GatewayOutcome::Error { reason },
        }
    }

    async fn verify_status(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<GatewayStatus, BookingError> {
        let state = self.read();
        state
            .verify_answers
            .get(transaction_id)
            .copied()
            .or(state.verify_default)
            .ok_or_else(|| BookingError::PaymentGateway {
                reason: format!("no status available for {transaction_id}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_charge_and_refund() {
        let gateway = InMemoryPaymentGateway::new();
        let payer = UserId::new();

        let outcome = gateway
            .charge(payer, Money::from_cents(5000), PaymentMethod::Upi)
            .await;
        let GatewayOutcome::Success { gateway_ref } = outcome else {
            panic!("expected approval");
        };
        assert!(gateway_ref.starts_with("GW-"));
        assert_eq!(gateway.charges().len(), 1);

        let refund = gateway.refund(&gateway_ref, Money::from_cents(2000)).await;
        assert!(refund.is_success());
        assert_eq!(gateway.net_collected(), Money::from_cents(3000));
    }

    #[tokio::test]
    async fn test_scripted_responses() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.decline_charges("insufficient funds");
        gateway.queue_charge_response(ScriptedResponse::Approve);

        let first = gateway
            .charge(UserId::new(), Money::from_units(1), PaymentMethod::Wallet)
            .await;
        assert!(first.is_success());

        let second = gateway
            .charge(UserId::new(), Money::from_units(1), PaymentMethod::Wallet)
            .await;
        assert_eq!(
            second,
            GatewayOutcome::Declined {
                reason: "insufficient funds".to_string()
            }
        );
        assert_eq!(gateway.charge_calls(), 2);
        assert_eq!(gateway.charges().len(), 1);
    }

    #[tokio::test]
    async fn test_refund_of_unknown_charge_is_declined() {
        let gateway = InMemoryPaymentGateway::new();
        let outcome = gateway.refund("GW-9999", Money::from_units(1)).await;
        assert!(matches!(outcome, GatewayOutcome::Declined { .. }));
        assert_eq!(gateway.refund_calls(), 1);
    }

    #[tokio::test]
    async fn test_verify_answers() {
        let gateway = InMemoryPaymentGateway::new();
        let txn = TransactionId::new("TXN-1");

        assert!(gateway.verify_status(&txn).await.is_err());

        gateway.set_default_verify_status(Some(GatewayStatus::Pending));
        gateway.set_verify_status(txn.clone(), GatewayStatus::Success);
        assert_eq!(
            gateway.verify_status(&txn).await.unwrap(),
            GatewayStatus::Success
        );
        assert_eq!(
            gateway
                .verify_status(&TransactionId::new("TXN-2"))
                .await
                .unwrap(),
            GatewayStatus::Pending
        );
    }
}
