//! Transactional storage abstraction for the admission core.
//!
//! A [`SessionTransaction`] is the unit of atomicity: it is opened by
//! [`ReservationStore::begin`] while holding the session's lock, and every
//! read and write made through it is indivisible with respect to any other
//! transaction on the same session. Dropping a transaction without calling
//! [`SessionTransaction::commit`] rolls it back.
//!
//! Two implementations are provided:
//! - PostgreSQL (row lock on the session plus a partial unique index)
//! - In-memory (using `tokio::sync::Mutex`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookhub_core::result::AppResult;
use bookhub_core::types::{ReservationId, SessionId, UserId};
use bookhub_entity::reservation::{NewReservation, Reservation, ReservationDetail, ReservationStatus};
use bookhub_entity::session::{NewSession, Session, SessionSummary};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryReservationStore;

/// One short-lived, session-scoped transaction.
#[async_trait]
pub trait SessionTransaction: Send {
    /// The locked session as read at the start of the transaction.
    fn session(&self) -> &Session;

    /// Find a reservation of this session.
    async fn find_reservation(&mut self, id: ReservationId) -> AppResult<Option<Reservation>>;

    /// The user's seat-holding reservation in this session, if any.
    async fn find_active_for_user(&mut self, user_id: UserId) -> AppResult<Option<Reservation>>;

    /// Count of seat-holding reservations in this session.
    async fn occupancy(&mut self) -> AppResult<i64>;

    /// Insert a reservation.
    ///
    /// Fails with `ErrorKind::Conflict` when the user already holds a seat
    /// in the session, whatever the caller checked before.
    async fn insert(&mut self, reservation: NewReservation) -> AppResult<Reservation>;

    /// Hard-delete a reservation. Returns whether a row was removed.
    async fn delete(&mut self, id: ReservationId) -> AppResult<bool>;

    /// Overwrite a reservation's status. Returns whether a row was updated.
    ///
    /// Moving into a seat-holding status is subject to the same uniqueness
    /// constraint as [`SessionTransaction::insert`].
    async fn update_status(&mut self, id: ReservationId, status: ReservationStatus)
    -> AppResult<bool>;

    /// Make every write of this transaction visible.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Durable store of sessions and reservations.
#[async_trait]
pub trait ReservationStore: Send + Sync + std::fmt::Debug {
    /// Open a transaction holding the session's lock.
    ///
    /// Returns `None` when the session does not exist.
    async fn begin(&self, session_id: SessionId) -> AppResult<Option<Box<dyn SessionTransaction>>>;

    /// Find a reservation without taking any lock.
    async fn find_reservation(&self, id: ReservationId) -> AppResult<Option<Reservation>>;

    /// A session together with its occupancy.
    async fn session_summary(&self, id: SessionId) -> AppResult<Option<SessionSummary>>;

    /// Every session with its occupancy, earliest start first.
    async fn list_session_summaries(&self) -> AppResult<Vec<SessionSummary>>;

    /// Create a session.
    async fn create_session(&self, data: &NewSession) -> AppResult<Session>;

    /// Replace a session's editable fields. Returns `None` if it does not exist.
    async fn update_session(&self, id: SessionId, data: &NewSession) -> AppResult<Option<Session>>;

    /// Delete a session and its reservations. Returns whether it existed.
    async fn delete_session(&self, id: SessionId) -> AppResult<bool>;

    /// A user's seat-holding reservations with their sessions, newest first.
    async fn active_reservations_for_user(&self, user_id: UserId)
    -> AppResult<Vec<ReservationDetail>>;

    /// All reservations whose session starts at or after `from`, ordered by
    /// session start.
    async fn reservations_starting_from(
        &self,
        from: DateTime<Utc>,
    ) -> AppResult<Vec<ReservationDetail>>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
