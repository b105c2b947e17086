//! Domain layer for the seat booking engine.
//!
//! This crate holds the synchronous, side-effect free part of the engine:
//! - Seat records and their AVAILABLE/LOCKED/BOOKED lifecycle
//! - Booking tickets and their PENDING/CONFIRMED/VOID/CANCELLED lifecycle
//! - Payment ledger entries with terminal-state-once transitions
//! - The pricing engine and the cancellation refund policy

pub mod cancellation;
pub mod error;
pub mod payment;
pub mod pricing;
pub mod seat;
pub mod ticket;

pub use cancellation::{CancellationPolicy, RefundQuote, RefundTier};
pub use error::DomainError;
pub use payment::{PaymentEntry, PaymentMethod, PaymentStatus};
pub use pricing::{PriceBreakdown, PricingError, PricingPolicy};
pub use seat::{SeatRecord, SeatStatus};
pub use ticket::{BookingTicket, TicketStatus, normalize_seats};
