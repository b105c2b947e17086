//! Booking engine configuration.

use std::time::Duration;

use common::Money;
use domain::{CancellationPolicy, PricingPolicy};

use crate::retry::RetryPolicy;

/// Default upper bound on a single gateway call.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for [`BookingWorkflow`](crate::BookingWorkflow).
#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub pricing: PricingPolicy,
    pub cancellation: CancellationPolicy,
    /// A charge or refund that takes longer than this is treated as a gateway error.
    pub gateway_timeout: Duration,
    /// Backoff used for every compensation and finalization step.
    pub compensation_retry: RetryPolicy,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            cancellation: CancellationPolicy::default(),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            compensation_retry: RetryPolicy::default(),
        }
    }
}

impl BookingConfig {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything absent or unparsable.
    ///
    /// - `BOOKING_SERVICE_CHARGE_BPS`
    /// - `BOOKING_TAX_BPS`
    /// - `BOOKING_PROCESSING_FEE_CENTS`
    /// - `BOOKING_CANCELLATION_CUTOFF_MINUTES`
    /// - `BOOKING_GATEWAY_TIMEOUT_MS`
    /// - `BOOKING_COMPENSATION_MAX_RETRIES`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<i64>().ok());
        let mut config = Self::default();

        if let Some(bps) = parse("BOOKING_SERVICE_CHARGE_BPS").and_then(|v| u32::try_from(v).ok()) {
            config.pricing.service_charge_bps = bps;
        }
        if let Some(bps) = parse("BOOKING_TAX_BPS").and_then(|v| u32::try_from(v).ok()) {
            config.pricing.tax_bps = bps;
        }
        if let Some(cents) = parse("BOOKING_PROCESSING_FEE_CENTS").filter(|v| *v >= 0) {
            config.pricing.processing_fee = Money::from_cents(cents);
        }
        if let Some(minutes) = parse("BOOKING_CANCELLATION_CUTOFF_MINUTES").filter(|v| *v >= 0) {
            config.cancellation = config
                .cancellation
                .with_cutoff(chrono::Duration::minutes(minutes));
        }
        if let Some(ms) = parse("BOOKING_GATEWAY_TIMEOUT_MS").filter(|v| *v > 0) {
            config.gateway_timeout = Duration::from_millis(ms as u64);
        }
        if let Some(retries) = parse("BOOKING_COMPENSATION_MAX_RETRIES").filter(|v| *v >= 0) {
            config.compensation_retry.max_retries = retries as usize;
        }

        config
    }
}
