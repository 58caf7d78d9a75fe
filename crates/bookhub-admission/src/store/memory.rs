//! In-memory reservation store using a Tokio mutex for single-node deployments.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use bookhub_core::error::AppError;
use bookhub_core::result::AppResult;
use bookhub_core::types::{ReservationId, SessionId, UserId};
use bookhub_entity::reservation::{NewReservation, Reservation, ReservationDetail, ReservationStatus};
use bookhub_entity::session::{NewSession, Session, SessionSummary};

use super::{ReservationStore, SessionTransaction};

/// Internal state for the memory-based store.
#[derive(Debug, Default)]
struct InnerState {
    /// Sessions by ID.
    sessions: HashMap<SessionId, Session>,
    /// Reservations by ID.
    reservations: HashMap<ReservationId, Reservation>,
}

impl InnerState {
    fn occupancy(&self, session_id: SessionId) -> i64 {
        self.reservations
            .values()
            .filter(|r| r.session_id == session_id && r.is_active())
            .count() as i64
    }

    fn active_for_user(&self, session_id: SessionId, user_id: UserId) -> Option<&Reservation> {
        self.reservations
            .values()
            .find(|r| r.session_id == session_id && r.user_id == user_id && r.is_active())
    }

    fn summary(&self, session_id: SessionId) -> Option<SessionSummary> {
        self.sessions
            .get(&session_id)
            .map(|s| SessionSummary::new(s.clone(), self.occupancy(session_id)))
    }

    fn details<'a>(&self, reservations: impl Iterator<Item = &'a Reservation>) -> Vec<ReservationDetail> {
        reservations
            .filter_map(|r| {
                self.summary(r.session_id).map(|session| ReservationDetail {
                    reservation: r.clone(),
                    session,
                })
            })
            .collect()
    }
}

/// In-memory store guarded by a single Tokio mutex.
///
/// A transaction owns the mutex guard for its whole lifetime, so admission,
/// cancellation and status changes are serialized store-wide. Suitable for
/// single-node deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryReservationStore {
    /// Protected inner state.
    state: Arc<Mutex<InnerState>>,
    /// Simulated backend outage.
    offline: Arc<AtomicBool>,
}

impl MemoryReservationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a backend outage: while offline every call fails with
    /// `ErrorKind::ServiceUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        warn!(offline = offline, "Memory store availability changed");
    }

    fn ensure_online(&self) -> AppResult<()> {
        ensure_online(&self.offline)
    }
}

fn ensure_online(flag: &AtomicBool) -> AppResult<()> {
    if flag.load(Ordering::SeqCst) {
        Err(AppError::service_unavailable("Memory reservation store is offline"))
    } else {
        Ok(())
    }
}

/// A write to revert if the transaction is dropped uncommitted.
#[derive(Debug)]
enum Undo {
    Remove(ReservationId),
    Restore(Reservation),
}

/// Transaction over the memory store. Holds the store lock until dropped.
struct MemoryTransaction {
    state: OwnedMutexGuard<InnerState>,
    session: Session,
    undo: Vec<Undo>,
    offline: Arc<AtomicBool>,
}

impl MemoryTransaction {
    fn check(&self) -> AppResult<()> {
        ensure_online(&self.offline)
    }

    fn owned(&self, id: ReservationId) -> Option<&Reservation> {
        self.state
            .reservations
            .get(&id)
            .filter(|r| r.session_id == self.session.id)
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.undo.is_empty() {
            return;
        }
        debug!(
            session_id = %self.session.id,
            writes = self.undo.len(),
            "Rolling back uncommitted memory transaction"
        );
        while let Some(op) = self.undo.pop() {
            match op {
                Undo::Remove(id) => {
                    self.state.reservations.remove(&id);
                }
                Undo::Restore(reservation) => {
                    self.state.reservations.insert(reservation.id, reservation);
                }
            }
        }
    }
}

#[async_trait]
impl SessionTransaction for MemoryTransaction {
    fn session(&self) -> &Session {
        &self.session
    }

    async fn find_reservation(&mut self, id: ReservationId) -> AppResult<Option<Reservation>> {
        self.check()?;
        Ok(self.owned(id).cloned())
    }

    async fn find_active_for_user(&mut self, user_id: UserId) -> AppResult<Option<Reservation>> {
        self.check()?;
        Ok(self.state.active_for_user(self.session.id, user_id).cloned())
    }

    async fn occupancy(&mut self) -> AppResult<i64> {
        self.check()?;
        Ok(self.state.occupancy(self.session.id))
    }

    async fn insert(&mut self, reservation: NewReservation) -> AppResult<Reservation> {
        self.check()?;
        if reservation.status.holds_seat()
            && self
                .state
                .active_for_user(reservation.session_id, reservation.user_id)
                .is_some()
        {
            return Err(AppError::conflict(
                "Active reservation already exists for user and session",
            ));
        }

        let row = reservation.into_reservation();
        self.state.reservations.insert(row.id, row.clone());
        self.undo.push(Undo::Remove(row.id));
        Ok(row)
    }

    async fn delete(&mut self, id: ReservationId) -> AppResult<bool> {
        self.check()?;
        if self.owned(id).is_none() {
            return Ok(false);
        }
        match self.state.reservations.remove(&id) {
            Some(previous) => {
                self.undo.push(Undo::Restore(previous));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> AppResult<bool> {
        self.check()?;
        let Some(current) = self.owned(id).cloned() else {
            return Ok(false);
        };

        if status.holds_seat()
            && !current.is_active()
            && self
                .state
                .active_for_user(current.session_id, current.user_id)
                .is_some()
        {
            return Err(AppError::conflict(
                "Active reservation already exists for user and session",
            ));
        }

        let mut updated = current.clone();
        updated.status = status;
        self.state.reservations.insert(id, updated);
        self.undo.push(Undo::Restore(current));
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut tx = self;
        tx.check()?;
        tx.undo.clear();
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for MemoryReservationStore {
    async fn begin(&self, session_id: SessionId) -> AppResult<Option<Box<dyn SessionTransaction>>> {
        self.ensure_online()?;
        let state = Arc::clone(&self.state).lock_owned().await;

        let Some(session) = state.sessions.get(&session_id).cloned() else {
            return Ok(None);
        };

        let tx: Box<dyn SessionTransaction> = Box::new(MemoryTransaction {
            state,
            session,
            undo: Vec::new(),
            offline: Arc::clone(&self.offline),
        });
        Ok(Some(tx))
    }

    async fn find_reservation(&self, id: ReservationId) -> AppResult<Option<Reservation>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        Ok(state.reservations.get(&id).cloned())
    }

    async fn session_summary(&self, id: SessionId) -> AppResult<Option<SessionSummary>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        Ok(state.summary(id))
    }

    async fn list_session_summaries(&self) -> AppResult<Vec<SessionSummary>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut summaries: Vec<SessionSummary> = state
            .sessions
            .keys()
            .filter_map(|id| state.summary(*id))
            .collect();
        summaries.sort_by_key(|s| (s.session.starts_at, s.session.id));
        Ok(summaries)
    }

    async fn create_session(&self, data: &NewSession) -> AppResult<Session> {
        self.ensure_online()?;
        let now = Utc::now();
        let session = Session {
            id: SessionId::new(),
            title: data.title.clone(),
            description: data.description.clone(),
            location: data.location.clone(),
            starts_at: data.starts_at,
            capacity: data.capacity,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.lock().await;
        state.sessions.insert(session.id, session.clone());
        info!(session_id = %session.id, capacity = session.capacity, "Session created");
        Ok(session)
    }

    async fn update_session(&self, id: SessionId, data: &NewSession) -> AppResult<Option<Session>> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&id) else {
            return Ok(None);
        };

        session.title = data.title.clone();
        session.description = data.description.clone();
        session.location = data.location.clone();
        session.starts_at = data.starts_at;
        session.capacity = data.capacity;
        session.updated_at = Utc::now();
        Ok(Some(session.clone()))
    }

    async fn delete_session(&self, id: SessionId) -> AppResult<bool> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        if state.sessions.remove(&id).is_none() {
            return Ok(false);
        }
        state.reservations.retain(|_, r| r.session_id != id);
        Ok(true)
    }

    async fn active_reservations_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<ReservationDetail>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut mine: Vec<&Reservation> = state
            .reservations
            .values()
            .filter(|r| r.user_id == user_id && r.is_active())
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(state.details(mine.into_iter()))
    }

    async fn reservations_starting_from(
        &self,
        from: DateTime<Utc>,
    ) -> AppResult<Vec<ReservationDetail>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut upcoming: Vec<(&Reservation, DateTime<Utc>)> = state
            .reservations
            .values()
            .filter_map(|r| {
                state
                    .sessions
                    .get(&r.session_id)
                    .filter(|s| s.starts_at >= from)
                    .map(|s| (r, s.starts_at))
            })
            .collect();
        upcoming.sort_by_key(|(r, starts_at)| (*starts_at, r.created_at));
        Ok(state.details(upcoming.into_iter().map(|(r, _)| r)))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.offline.load(Ordering::SeqCst))
    }
}
