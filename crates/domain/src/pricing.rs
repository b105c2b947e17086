//! Pricing engine: seat prices plus service charge, tax and processing fee.

use common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service charge applied to the base seat total, in basis points (5%).
pub const SERVICE_CHARGE_BPS: u32 = 500;

/// Tax applied to the base seat total, in basis points (18%).
pub const TAX_BPS: u32 = 1_800;

/// Flat processing fee added to every booking.
pub const PROCESSING_FEE: Money = Money::from_cents(1_000);

/// Errors from price computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// The seat prices sum to zero or less.
    #[error("Base amount must be greater than zero, got {0}")]
    NonPositiveBase(Money),
}

/// Itemized price of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base: Money,
    pub service_charge: Money,
    pub tax: Money,
    pub processing_fee: Money,
    pub total: Money,
}

/// Rates used to turn seat prices into a chargeable total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub service_charge_bps: u32,
    pub tax_bps: u32,
    pub processing_fee: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            service_charge_bps: SERVICE_CHARGE_BPS,
            tax_bps: TAX_BPS,
            processing_fee: PROCESSING_FEE,
        }
    }
}

impl PricingPolicy {
    /// Computes the itemized price for the given seat prices.
    ///
    /// Percentages are taken on the base sum and rounded to the cent
    /// independently.
    pub fn breakdown(&self, seat_prices: &[Money]) -> Result<PriceBreakdown, PricingError> {
        let base: Money = seat_prices.iter().copied().sum();
        if !base.is_positive() {
            return Err(PricingError::NonPositiveBase(base));
        }

        let service_charge = base.percent_bps(self.service_charge_bps);
        let tax = base.percent_bps(self.tax_bps);
        let total = base + service_charge + tax + self.processing_fee;

        Ok(PriceBreakdown {
            base,
            service_charge,
            tax,
            processing_fee: self.processing_fee,
            total,
        })
    }

    /// Computes the total chargeable amount for the given seat prices.
    pub fn compute_total(&self, seat_prices: &[Money]) -> Result<Money, PricingError> {
        self.breakdown(seat_prices).map(|b| b.total)
    }
}
