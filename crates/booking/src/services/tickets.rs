//! Ticket repository trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{TicketId, UserId};
use domain::BookingTicket;
use tokio::sync::RwLock;

use crate::error::BookingError;

/// Storage for booking tickets. Tickets are never deleted.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Stores a new ticket; fails if the id is taken.
    async fn insert(&self, ticket: BookingTicket) -> Result<(), BookingError>;

    async fn get(&self, ticket_id: TicketId) -> Result<Option<BookingTicket>, BookingError>;

    /// Replaces an existing ticket.
    async fn update(&self, ticket: BookingTicket) -> Result<(), BookingError>;

    /// All tickets of a user, oldest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<BookingTicket>, BookingError>;
}

/// In-memory ticket repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketRepository {
    tickets: Arc<RwLock<HashMap<TicketId, BookingTicket>>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored tickets.
    pub async fn ticket_count(&self) -> usize {
        self.tickets.read().await.len()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn insert(&self, ticket: BookingTicket) -> Result<(), BookingError> {
        let mut tickets = self.tickets.write().await;
        if tickets.contains_key(&ticket.id()) {
            return Err(BookingError::InvalidState(format!(
                "ticket {} already exists",
                ticket.id()
            )));
        }
        tickets.insert(ticket.id(), ticket);
        Ok(())
    }

    async fn get(&self, ticket_id: TicketId) -> Result<Option<BookingTicket>, BookingError> {
        Ok(self.tickets.read().await.get(&ticket_id).cloned())
    }

    async fn update(&self, ticket: BookingTicket) -> Result<(), BookingError> {
        let mut tickets = self.tickets.write().await;
        match tickets.get_mut(&ticket.id()) {
            Some(existing) => {
                *existing = ticket;
                Ok(())
            }
            None => Err(BookingError::TicketNotFound(ticket.id())),
        }
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<BookingTicket>, BookingError> {
        let tickets = self.tickets.read().await;
        let mut owned: Vec<BookingTicket> = tickets
            .values()
            .filter(|t| t.user_id() == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|t| t.created_at());
        Ok(owned)
    }
}
