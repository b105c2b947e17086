//! Demo catalog seeded at startup so the server is usable out of the box.

use booking::{CatalogSeat, InMemoryCatalog, InMemoryUserDirectory, ShowInfo, User};
use chrono::{Duration, Utc};
use common::{Money, SeatId, ShowId, UserId};

/// Rows of the demo auditorium with their seat price in whole units.
const ROWS: [(char, i64); 3] = [('A', 250), ('B', 200), ('C', 150)];
const SEATS_PER_ROW: u32 = 8;

/// Identifiers of the seeded demo records.
#[derive(Debug, Clone, Copy)]
pub struct DemoData {
    pub show_id: ShowId,
    pub user_id: UserId,
}

/// Adds one show three days out and one user.
pub async fn seed(catalog: &InMemoryCatalog, users: &InMemoryUserDirectory) -> DemoData {
    let show_id = ShowId::new();
    let seats = ROWS
        .iter()
        .flat_map(|(row, units)| {
            (1..=SEATS_PER_ROW).map(move |n| CatalogSeat {
                seat_id: SeatId::new(format!("{row}{n}")),
                price: Money::from_units(*units),
            })
        })
        .collect();
    catalog
        .add_show(
            ShowInfo {
                id: show_id,
                title: "Opening Night".to_string(),
                auditorium: "Screen 1".to_string(),
                starts_at: Utc::now() + Duration::days(3),
            },
            seats,
        )
        .await;

    let user_id = UserId::new();
    users
        .add_user(User {
            id: user_id,
            name: "Demo User".to_string(),
            email: "demo@example.com".to_string(),
        })
        .await;

    DemoData { show_id, user_id }
}

#[cfg(test)]
mod tests {
    use booking::Catalog;

    use super::*;

    #[tokio::test]
    async fn test_seed_creates_show_and_user() {
        let catalog = InMemoryCatalog::new();
        let users = InMemoryUserDirectory::new();
        let demo = seed(&catalog, &users).await;

        let seats = catalog.get_seats_for_show(demo.show_id).await.unwrap();
        assert_eq!(seats.len(), 24);
        assert_eq!(seats[0].price, Money::from_units(250));
        assert!(catalog.get_show(demo.show_id).await.unwrap().is_some());
    }
}
