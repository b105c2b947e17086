//! Collaborator traits used by the booking workflow, with in-memory implementations.

pub mod catalog;
pub mod gateway;
pub mod inventory;
pub mod ledger;
pub mod random_gateway;
pub mod tickets;

pub use catalog::{
    Catalog, CatalogSeat, InMemoryCatalog, InMemoryUserDirectory, ShowInfo, User, UserDirectory,
};
pub use gateway::{
    GatewayOutcome, GatewayStatus, InMemoryPaymentGateway, PaymentGateway, RecordedCharge,
    RecordedRefund, ScriptedResponse,
};
pub use inventory::{InMemorySeatInventory, LockOutcome, SeatInventory};
pub use ledger::{InMemoryPaymentLedger, PaymentLedger};
pub use random_gateway::{RandomGatewayConfig, RandomPaymentGateway};
pub use tickets::{InMemoryTicketRepository, TicketRepository};
