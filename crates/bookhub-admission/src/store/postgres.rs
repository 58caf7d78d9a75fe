//! PostgreSQL reservation store for multi-node deployments.
//!
//! Atomicity comes from `SELECT … FOR UPDATE` on the session row at the
//! start of each transaction; the partial unique index on
//! `(user_id, session_id) WHERE status <> 'cancelled'` backs the
//! uniqueness rule at the storage level. Waiting for the row lock is
//! bounded by `lock_timeout`, so a stuck holder surfaces as
//! `ServiceUnavailable` instead of an unbounded wait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use tracing::debug;

use bookhub_core::result::AppResult;
use bookhub_core::types::{ReservationId, SessionId, UserId};
use bookhub_database::DatabasePool;
use bookhub_database::repositories::{ReservationRepository, SessionRepository, map_sqlx};
use bookhub_entity::reservation::{NewReservation, Reservation, ReservationDetail, ReservationStatus};
use bookhub_entity::session::{NewSession, Session, SessionSummary};

use super::{ReservationStore, SessionTransaction};

/// Reservation store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgReservationStore {
    db: DatabasePool,
    sessions: SessionRepository,
    reservations: ReservationRepository,
}

impl PgReservationStore {
    /// Creates a store over a connected pool.
    pub fn new(db: DatabasePool) -> Self {
        Self {
            sessions: SessionRepository::new(db.pool().clone()),
            reservations: ReservationRepository::new(db.pool().clone()),
            db,
        }
    }

    /// Join reservations with the summaries of their sessions, keeping the
    /// reservations' order.
    async fn with_sessions(&self, reservations: Vec<Reservation>) -> AppResult<Vec<ReservationDetail>> {
        let mut ids: Vec<SessionId> = reservations.iter().map(|r| r.session_id).collect();
        ids.sort();
        ids.dedup();

        let summaries: HashMap<SessionId, SessionSummary> = self
            .sessions
            .find_summaries_by_ids(&ids)
            .await?
            .into_iter()
            .map(|s| (s.session.id, s))
            .collect();

        Ok(reservations
            .into_iter()
            .filter_map(|reservation| {
                summaries
                    .get(&reservation.session_id)
                    .cloned()
                    .map(|session| ReservationDetail {
                        reservation,
                        session,
                    })
            })
            .collect())
    }
}

/// A sqlx transaction holding the session row lock.
struct PgSessionTransaction {
    tx: Transaction<'static, Postgres>,
    session: Session,
}

#[async_trait]
impl SessionTransaction for PgSessionTransaction {
    fn session(&self) -> &Session {
        &self.session
    }

    async fn find_reservation(&mut self, id: ReservationId) -> AppResult<Option<Reservation>> {
        let found = ReservationRepository::find_in(&mut self.tx, id).await?;
        Ok(found.filter(|r| r.session_id == self.session.id))
    }

    async fn find_active_for_user(&mut self, user_id: UserId) -> AppResult<Option<Reservation>> {
        ReservationRepository::find_active_for_user_in(&mut self.tx, self.session.id, user_id).await
    }

    async fn occupancy(&mut self) -> AppResult<i64> {
        ReservationRepository::count_active_in(&mut self.tx, self.session.id).await
    }

    async fn insert(&mut self, reservation: NewReservation) -> AppResult<Reservation> {
        let row = reservation.into_reservation();
        ReservationRepository::insert_in(&mut self.tx, &row).await
    }

    async fn delete(&mut self, id: ReservationId) -> AppResult<bool> {
        ReservationRepository::delete_in(&mut self.tx, id).await
    }

    async fn update_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> AppResult<bool> {
        ReservationRepository::update_status_in(&mut self.tx, id, status).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        this.tx
            .commit()
            .await
            .map_err(|e| map_sqlx("Failed to commit reservation transaction", e))
    }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn begin(&self, session_id: SessionId) -> AppResult<Option<Box<dyn SessionTransaction>>> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx("Failed to begin reservation transaction", e))?;

        SessionRepository::set_lock_timeout_in(&mut tx, self.db.lock_timeout()).await?;

        let Some(session) = SessionRepository::lock_in(&mut tx, session_id).await? else {
            debug!(session_id = %session_id, "Session not found, rolling back");
            return Ok(None);
        };

        let tx: Box<dyn SessionTransaction> = Box::new(PgSessionTransaction { tx, session });
        Ok(Some(tx))
    }

    async fn find_reservation(&self, id: ReservationId) -> AppResult<Option<Reservation>> {
        self.reservations.find_by_id(id).await
    }

    async fn session_summary(&self, id: SessionId) -> AppResult<Option<SessionSummary>> {
        self.sessions.find_summary(id).await
    }

    async fn list_session_summaries(&self) -> AppResult<Vec<SessionSummary>> {
        self.sessions.find_all_summaries().await
    }

    async fn create_session(&self, data: &NewSession) -> AppResult<Session> {
        self.sessions.create(data).await
    }

    async fn update_session(&self, id: SessionId, data: &NewSession) -> AppResult<Option<Session>> {
        self.sessions.update(id, data).await
    }

    async fn delete_session(&self, id: SessionId) -> AppResult<bool> {
        self.sessions.delete(id).await
    }

    async fn active_reservations_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<ReservationDetail>> {
        let reservations = self.reservations.find_active_by_user(user_id).await?;
        self.with_sessions(reservations).await
    }

    async fn reservations_starting_from(
        &self,
        from: DateTime<Utc>,
    ) -> AppResult<Vec<ReservationDetail>> {
        let reservations = self
            .reservations
            .find_for_sessions_starting_from(from)
            .await?;
        self.with_sessions(reservations).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.db.health_check().await
    }
}
