//! Read-only catalog and user directory collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, SeatId, ShowId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::BookingError;

/// A scheduled screening of a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowInfo {
    pub id: ShowId,
    pub title: String,
    pub auditorium: String,
    pub starts_at: DateTime<Utc>,
}

/// A seat offered for a show and its price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSeat {
    pub seat_id: SeatId,
    pub price: Money,
}

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Show and seat metadata owned by another service.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_show(&self, show_id: ShowId) -> Result<Option<ShowInfo>, BookingError>;

    /// Seats offered for the show with their prices.
    async fn get_seats_for_show(&self, show_id: ShowId)
    -> Result<Vec<CatalogSeat>, BookingError>;
}

/// Customer lookup owned by another service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, BookingError>;
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    shows: Arc<RwLock<HashMap<ShowId, (ShowInfo, Vec<CatalogSeat>)>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a show and its seats.
    pub async fn add_show(&self, show: ShowInfo, seats: Vec<CatalogSeat>) {
        self.shows.write().await.insert(show.id, (show, seats));
    }

    /// Moves a show's start time.
    pub async fn reschedule(&self, show_id: ShowId, starts_at: DateTime<Utc>) -> bool {
        match self.shows.write().await.get_mut(&show_id) {
            Some((show, _)) => {
                show.starts_at = starts_at;
                true
            }
            None => false,
        }
    }

    /// Lists all shows ordered by start time.
    pub async fn shows(&self) -> Vec<ShowInfo> {
        let mut shows: Vec<ShowInfo> = self
            .shows
            .read()
            .await
            .values()
            .map(|(show, _)| show.clone())
            .collect();
        shows.sort_by_key(|s| s.starts_at);
        shows
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get_show(&self, show_id: ShowId) -> Result<Option<ShowInfo>, BookingError> {
        Ok(self
            .shows
            .read()
            .await
            .get(&show_id)
            .map(|(show, _)| show.clone()))
    }

    async fn get_seats_for_show(
        &self,
        show_id: ShowId,
    ) -> Result<Vec<CatalogSeat>, BookingError> {
        self.shows
            .read()
            .await
            .get(&show_id)
            .map(|(_, seats)| seats.clone())
            .ok_or(BookingError::ShowNotFound(show_id))
    }
}

/// In-memory user directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, BookingError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}
