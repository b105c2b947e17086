//! Seat inventory trait and in-memory implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{Money, SeatId, ShowId, TicketId};
use domain::SeatRecord;
use tokio::sync::{Mutex, RwLock};

use crate::error::BookingError;

/// Result of an all-or-nothing lock attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// Every requested seat is now locked; records are in acquisition order.
    Locked(Vec<SeatRecord>),
    /// The first seat (in acquisition order) that was not available.
    /// Nothing was changed.
    Unavailable(SeatId),
}

/// Authoritative per-show seat state.
///
/// Implementations must make `try_lock_all` atomic per show: two concurrent
/// calls for overlapping seats can never both succeed, and a failed call
/// leaves every seat exactly as it was.
#[async_trait]
pub trait SeatInventory: Send + Sync {
    /// Creates one available record per seat. Returns false if the show was
    /// already scheduled, in which case nothing changes.
    async fn schedule_show(
        &self,
        show_id: ShowId,
        seats: Vec<(SeatId, Money)>,
    ) -> Result<bool, BookingError>;

    /// Returns true if seat records exist for the show.
    async fn is_scheduled(&self, show_id: ShowId) -> Result<bool, BookingError>;

    /// Locks every seat for `holder`, or none of them.
    async fn try_lock_all(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: TicketId,
    ) -> Result<LockOutcome, BookingError>;

    /// Moves seats locked by `holder` to booked. All or nothing.
    async fn confirm(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: TicketId,
    ) -> Result<(), BookingError>;

    /// Frees seats held by `holder`. Seats already available or held by
    /// another ticket are skipped. Returns the number of seats freed.
    async fn release(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: TicketId,
    ) -> Result<usize, BookingError>;

    /// Returns every seat record for the show, ordered by seat id.
    async fn seats(&self, show_id: ShowId) -> Result<Vec<SeatRecord>, BookingError>;
}

type ShowSeats = Arc<Mutex<BTreeMap<SeatId, SeatRecord>>>;

#[derive(Debug, Default)]
struct Faults {
    failing_releases: AtomicUsize,
    fail_on_confirm: AtomicBool,
}

/// In-memory seat inventory with one mutex per show.
///
/// The show map lock is only held long enough to find the show's seat map;
/// all seat mutations happen under the per-show mutex, so bookings for
/// different shows never contend.
#[derive(Debug, Clone, Default)]
pub struct InMemorySeatInventory {
    shows: Arc<RwLock<HashMap<ShowId, ShowSeats>>>,
    faults: Arc<Faults>,
}

impl InMemorySeatInventory {
    /// Creates an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` release calls fail with a storage error.
    pub fn fail_next_releases(&self, count: usize) {
        self.faults.failing_releases.store(count, Ordering::SeqCst);
    }

    /// Configures confirm calls to fail with a storage error.
    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.faults.fail_on_confirm.store(fail, Ordering::SeqCst);
    }

    async fn show(&self, show_id: ShowId) -> Result<ShowSeats, BookingError> {
        self.shows
            .read()
            .await
            .get(&show_id)
            .cloned()
            .ok_or(BookingError::ShowNotFound(show_id))
    }

    fn take_release_fault(&self) -> bool {
        self.faults
            .failing_releases
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn missing_seat(show_id: ShowId, seat_id: &SeatId) -> BookingError {
    BookingError::SeatNotFound {
        show_id,
        seat_id: seat_id.clone(),
    }
}

#[async_trait]
impl SeatInventory for InMemorySeatInventory {
    async fn schedule_show(
        &self,
        show_id: ShowId,
        seats: Vec<(SeatId, Money)>,
    ) -> Result<bool, BookingError> {
        let mut shows = self.shows.write().await;
        if shows.contains_key(&show_id) {
            return Ok(false);
        }

        let records = seats
            .into_iter()
            .map(|(seat_id, price)| (seat_id.clone(), SeatRecord::new(show_id, seat_id, price)))
            .collect();
        shows.insert(show_id, Arc::new(Mutex::new(records)));
        Ok(true)
    }

    async fn is_scheduled(&self, show_id: ShowId) -> Result<bool, BookingError> {
        Ok(self.shows.read().await.contains_key(&show_id))
    }

    async fn try_lock_all(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: TicketId,
    ) -> Result<LockOutcome, BookingError> {
        let mut ordered: Vec<&SeatId> = seat_ids.iter().collect();
        ordered.sort();
        ordered.dedup();

        let show = self.show(show_id).await?;
        let mut seats = show.lock().await;

        // Check every seat before touching any of them.
        for seat_id in &ordered {
            let record = seats
                .get(*seat_id)
                .ok_or_else(|| missing_seat(show_id, seat_id))?;
            if !record.is_available() {
                return Ok(LockOutcome::Unavailable((*seat_id).clone()));
            }
        }

        let mut locked = Vec::with_capacity(ordered.len());
        for seat_id in ordered {
            let record = seats
                .get_mut(seat_id)
                .ok_or_else(|| missing_seat(show_id, seat_id))?;
            record.lock(holder)?;
            locked.push(record.clone());
        }
        Ok(LockOutcome::Locked(locked))
    }

    async fn confirm(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: TicketId,
    ) -> Result<(), BookingError> {
        if self.faults.fail_on_confirm.load(Ordering::SeqCst) {
            return Err(BookingError::Storage("seat store unavailable".to_string()));
        }

        let show = self.show(show_id).await?;
        let mut seats = show.lock().await;

        // Validate on copies so a failure part-way leaves the map untouched.
        let mut confirmed = Vec::with_capacity(seat_ids.len());
        for seat_id in seat_ids {
            let mut record = seats
                .get(seat_id)
                .cloned()
                .ok_or_else(|| missing_seat(show_id, seat_id))?;
            record.confirm(holder)?;
            confirmed.push(record);
        }
        for record in confirmed {
            seats.insert(record.seat_id().clone(), record);
        }
        Ok(())
    }

    async fn release(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: TicketId,
    ) -> Result<usize, BookingError> {
        if self.take_release_fault() {
            return Err(BookingError::Storage("seat store unavailable".to_string()));
        }

        let show = self.show(show_id).await?;
        let mut seats = show.lock().await;

        let mut freed = 0;
        for seat_id in seat_ids {
            if seats
                .get_mut(seat_id)
                .is_some_and(|record| record.release(holder))
            {
                freed += 1;
            }
        }
        Ok(freed)
    }

    async fn seats(&self, show_id: ShowId) -> Result<Vec<SeatRecord>, BookingError> {
        let show = self.show(show_id).await?;
        let seats = show.lock().await;
        Ok(seats.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::SeatStatus;

    fn seat(id: &str) -> SeatId {
        SeatId::new(id)
    }

    async fn scheduled() -> (InMemorySeatInventory, ShowId) {
        let inventory = InMemorySeatInventory::new();
        let show_id = ShowId::new();
        let seats = ["A1", "A2", "A3", "B1"]
            .into_iter()
            .map(|s| (seat(s), Money::from_units(100)))
            .collect();
        assert!(inventory.schedule_show(show_id, seats).await.unwrap());
        (inventory, show_id)
    }

    async fn status(inventory: &InMemorySeatInventory, show_id: ShowId, id: &str) -> SeatStatus {
        inventory
            .seats(show_id)
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.seat_id().as_str() == id)
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_schedule_is_idempotent() {
        let (inventory, show_id) = scheduled().await;
        let again = inventory
            .schedule_show(show_id, vec![(seat("Z9"), Money::from_units(1))])
            .await
            .unwrap();
        assert!(!again);
        assert_eq!(inventory.seats(show_id).await.unwrap().len(), 4);
        assert!(inventory.is_scheduled(show_id).await.unwrap());
        assert!(!inventory.is_scheduled(ShowId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_all_in_acquisition_order() {
        let (inventory, show_id) = scheduled().await;
        let holder = TicketId::new();

        let outcome = inventory
            .try_lock_all(show_id, &[seat("B1"), seat("A2")], holder)
            .await
            .unwrap();
        let LockOutcome::Locked(records) = outcome else {
            panic!("expected seats to be locked");
        };
        let ids: Vec<&str> = records.iter().map(|r| r.seat_id().as_str()).collect();
        assert_eq!(ids, vec!["A2", "B1"]);
        assert!(records.iter().all(|r| r.holder() == Some(holder)));
    }

    #[tokio::test]
    async fn test_partial_overlap_changes_nothing() {
        let (inventory, show_id) = scheduled().await;
        inventory
            .try_lock_all(show_id, &[seat("A2")], TicketId::new())
            .await
            .unwrap();

        let outcome = inventory
            .try_lock_all(show_id, &[seat("A1"), seat("A2"), seat("A3")], TicketId::new())
            .await
            .unwrap();
        assert_eq!(outcome, LockOutcome::Unavailable(seat("A2")));
        assert_eq!(status(&inventory, show_id, "A1").await, SeatStatus::Available);
        assert_eq!(status(&inventory, show_id, "A3").await, SeatStatus::Available);
    }

    #[tokio::test]
    async fn test_unknown_seat_and_show() {
        let (inventory, show_id) = scheduled().await;
        let err = inventory
            .try_lock_all(show_id, &[seat("A1"), seat("Q9")], TicketId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SeatNotFound { .. }));
        assert_eq!(status(&inventory, show_id, "A1").await, SeatStatus::Available);

        let err = inventory.seats(ShowId::new()).await.unwrap_err();
        assert!(matches!(err, BookingError::ShowNotFound(_)));
    }

    #[tokio::test]
    async fn test_confirm_requires_holder() {
        let (inventory, show_id) = scheduled().await;
        let holder = TicketId::new();
        let seats = [seat("A1"), seat("A2")];
        inventory.try_lock_all(show_id, &seats, holder).await.unwrap();

        let err = inventory
            .confirm(show_id, &seats, TicketId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidState(_)));
        assert_eq!(status(&inventory, show_id, "A1").await, SeatStatus::Locked);

        inventory.confirm(show_id, &seats, holder).await.unwrap();
        assert_eq!(status(&inventory, show_id, "A1").await, SeatStatus::Booked);
        assert_eq!(status(&inventory, show_id, "A2").await, SeatStatus::Booked);
    }

    #[tokio::test]
    async fn test_release_is_idempotent_and_holder_scoped() {
        let (inventory, show_id) = scheduled().await;
        let owner = TicketId::new();
        let seats = [seat("A1"), seat("B1")];
        inventory.try_lock_all(show_id, &seats, owner).await.unwrap();

        assert_eq!(inventory.release(show_id, &seats, TicketId::new()).await.unwrap(), 0);
        assert_eq!(status(&inventory, show_id, "A1").await, SeatStatus::Locked);

        assert_eq!(inventory.release(show_id, &seats, owner).await.unwrap(), 2);
        assert_eq!(inventory.release(show_id, &seats, owner).await.unwrap(), 0);
        assert_eq!(status(&inventory, show_id, "B1").await, SeatStatus::Available);
    }

    #[tokio::test]
    async fn test_release_fault_injection() {
        let (inventory, show_id) = scheduled().await;
        let owner = TicketId::new();
        inventory.try_lock_all(show_id, &[seat("A1")], owner).await.unwrap();

        inventory.fail_next_releases(2);
        assert!(inventory.release(show_id, &[seat("A1")], owner).await.is_err());
        assert!(inventory.release(show_id, &[seat("A1")], owner).await.is_err());
        assert_eq!(inventory.release(show_id, &[seat("A1")], owner).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_locks_have_one_winner() {
        let (inventory, show_id) = scheduled().await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let inventory = inventory.clone();
            handles.push(tokio::spawn(async move {
                inventory
                    .try_lock_all(show_id, &[seat("A3"), seat("A1")], TicketId::new())
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), LockOutcome::Locked(_)) {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
