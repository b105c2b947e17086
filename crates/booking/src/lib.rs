//! Booking transaction engine.
//!
//! Turns "user U wants seats S for show X" into exactly one of two outcomes:
//! every seat booked under a confirmed, paid ticket, or no lasting effect at
//! all. The booking saga follows these steps:
//! 1. Lock seats (all or nothing, per-show critical section)
//! 2. Create a pending ticket
//! 3. Charge the customer
//! 4. Book the seats and confirm the ticket
//!
//! If any step after the lock fails, completed steps are compensated in
//! reverse order with retry. Cancellation of a confirmed ticket refunds
//! according to a tiered policy.

pub mod attempt;
pub mod config;
pub mod error;
pub mod retry;
pub mod services;
pub mod state;
pub mod steps;
pub mod workflow;

pub use attempt::BookingAttempt;
pub use config::BookingConfig;
pub use error::BookingError;
pub use retry::{RetryPolicy, retry_with_backoff};
pub use services::{
    Catalog, CatalogSeat, GatewayOutcome, GatewayStatus, InMemoryCatalog, InMemoryPaymentGateway,
    InMemoryPaymentLedger, InMemorySeatInventory, InMemoryTicketRepository,
    InMemoryUserDirectory, LockOutcome, PaymentGateway, PaymentLedger, RandomGatewayConfig,
    RandomPaymentGateway, ScriptedResponse, SeatInventory, ShowInfo, TicketRepository, User,
    UserDirectory,
};
pub use state::BookingState;
pub use workflow::{BookingServices, BookingWorkflow, CancellationReceipt};
