//! Randomized payment gateway simulation.

use std::time::Duration;

use async_trait::async_trait;
use common::{Money, TransactionId, UserId};
use domain::PaymentMethod;
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::error::BookingError;
use crate::services::gateway::{GatewayOutcome, GatewayStatus, PaymentGateway};

/// Probabilities and latency for [`RandomPaymentGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct RandomGatewayConfig {
    pub charge_success_rate: f64,
    pub refund_success_rate: f64,
    pub verify_success_rate: f64,
    pub verify_failed_rate: f64,
    /// Upper bound of the uniformly distributed simulated latency.
    pub max_latency: Duration,
}

impl Default for RandomGatewayConfig {
    fn default() -> Self {
        Self {
            charge_success_rate: 0.90,
            refund_success_rate: 0.95,
            verify_success_rate: 0.70,
            verify_failed_rate: 0.20,
            max_latency: Duration::from_millis(200),
        }
    }
}

/// Gateway that succeeds or fails at random, for demos and load tests.
#[derive(Debug, Clone, Default)]
pub struct RandomPaymentGateway {
    config: RandomGatewayConfig,
}

impl RandomPaymentGateway {
    pub fn new(config: RandomGatewayConfig) -> Self {
        Self { config }
    }

    async fn simulate_latency(&self) {
        let max_ms = self.config.max_latency.as_millis() as u64;
        if max_ms == 0 {
            return;
        }
        let delay = rand::thread_rng().gen_range(0..=max_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    fn roll(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// Random uppercase alphanumeric reference such as `GW-7K2Q9XH1`.
fn short_ref(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{prefix}-{suffix}")
}

#[async_trait]
impl PaymentGateway for RandomPaymentGateway {
    async fn charge(&self, payer: UserId, amount: Money, method: PaymentMethod) -> GatewayOutcome {
        self.simulate_latency().await;

        if self.roll() < self.config.charge_success_rate {
            let gateway_ref = short_ref("GW");
            tracing::debug!(%payer, %amount, %method, %gateway_ref, "simulated charge approved");
            GatewayOutcome::Success { gateway_ref }
        } else {
            tracing::debug!(%payer, %amount, %method, "simulated charge declined");
            GatewayOutcome::Declined {
                reason: "Payment declined by bank".to_string(),
            }
        }
    }

    async fn refund(&self, original_ref: &str, amount: Money) -> GatewayOutcome {
        self.simulate_latency().await;

        if self.roll() < self.config.refund_success_rate {
            GatewayOutcome::Success {
                gateway_ref: short_ref("RF"),
            }
        } else {
            tracing::debug!(original_ref, %amount, "simulated refund failure");
            GatewayOutcome::Error {
                reason: "Refund processing failed".to_string(),
            }
        }
    }

    async fn verify_status(
        &self,
        _transaction_id: &TransactionId,
    ) -> Result<GatewayStatus, BookingError> {
        self.simulate_latency().await;

        let roll = self.roll();
        let status = if roll < self.config.verify_success_rate {
            GatewayStatus::Success
        } else if roll < self.config.verify_success_rate + self.config.verify_failed_rate {
            GatewayStatus::Failed
        } else {
            GatewayStatus::Pending
        };
        Ok(status)
    }
}
