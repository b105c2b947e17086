//! Cancellation cutoff and tiered refund policy.

use chrono::Duration;
use common::Money;

use crate::error::DomainError;

/// Default minimum notice before show start below which cancellation is refused.
pub const DEFAULT_CUTOFF_HOURS: i64 = 2;

/// Notice above which the generous refund tier applies.
pub const FULL_TIER_HOURS: i64 = 24;

/// Refund rate for cancellations with more than [`FULL_TIER_HOURS`] notice (90%).
pub const FULL_TIER_REFUND_BPS: u32 = 9_000;

/// Refund rate for cancellations between the cutoff and [`FULL_TIER_HOURS`] (50%).
pub const PARTIAL_TIER_REFUND_BPS: u32 = 5_000;

/// A refund rate that applies when the notice exceeds `min_notice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundTier {
    pub min_notice: Duration,
    pub refund_bps: u32,
}

/// The refund a cancellation would receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundQuote {
    pub refund_bps: u32,
    pub amount: Money,
}

/// Decides whether a confirmed ticket may be cancelled and how much is refunded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationPolicy {
    cutoff: Duration,
    /// Sorted by `min_notice`, largest first.
    tiers: Vec<RefundTier>,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            cutoff: Duration::hours(DEFAULT_CUTOFF_HOURS),
            tiers: vec![
                RefundTier {
                    min_notice: Duration::hours(FULL_TIER_HOURS),
                    refund_bps: FULL_TIER_REFUND_BPS,
                },
                RefundTier {
                    min_notice: Duration::hours(DEFAULT_CUTOFF_HOURS),
                    refund_bps: PARTIAL_TIER_REFUND_BPS,
                },
            ],
        }
    }
}

impl CancellationPolicy {
    /// Builds a policy from a cutoff and refund tiers in any order.
    pub fn new(cutoff: Duration, mut tiers: Vec<RefundTier>) -> Result<Self, DomainError> {
        if cutoff < Duration::zero() {
            return Err(DomainError::InvalidPolicy(
                "cancellation cutoff cannot be negative".to_string(),
            ));
        }
        if let Some(tier) = tiers.iter().find(|t| t.refund_bps > 10_000) {
            return Err(DomainError::InvalidPolicy(format!(
                "refund tier above 100%: {} bps",
                tier.refund_bps
            )));
        }
        tiers.sort_by(|a, b| b.min_notice.cmp(&a.min_notice));
        Ok(Self { cutoff, tiers })
    }

    /// Returns a copy of this policy with a different cutoff.
    pub fn with_cutoff(mut self, cutoff: Duration) -> Self {
        self.cutoff = cutoff.max(Duration::zero());
        self
    }

    pub fn cutoff(&self) -> Duration {
        self.cutoff
    }

    pub fn tiers(&self) -> &[RefundTier] {
        &self.tiers
    }

    /// Returns true if `notice` before show start is still outside the cutoff.
    pub fn allows(&self, notice: Duration) -> bool {
        notice > self.cutoff
    }

    /// Refund rate for the given notice; zero when no tier matches.
    pub fn refund_bps(&self, notice: Duration) -> u32 {
        self.tiers
            .iter()
            .find(|tier| notice > tier.min_notice)
            .map(|tier| tier.refund_bps)
            .unwrap_or(0)
    }

    /// Quotes the refund for a ticket of `total` cancelled with `notice` to spare.
    ///
    /// Returns `None` when the cancellation falls inside the cutoff.
    pub fn quote(&self, total: Money, notice: Duration) -> Option<RefundQuote> {
        if !self.allows(notice) {
            return None;
        }
        let refund_bps = self.refund_bps(notice);
        Some(RefundQuote {
            refund_bps,
            amount: total.percent_bps(refund_bps),
        })
    }
}
