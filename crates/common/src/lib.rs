//! Shared types for the seat booking engine.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{SeatId, ShowId, TicketId, TransactionId, UserId};
