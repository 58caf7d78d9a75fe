//! Reservation repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use bookhub_core::result::AppResult;
use bookhub_core::types::{ReservationId, SessionId, UserId};
use bookhub_entity::reservation::{Reservation, ReservationStatus};

use super::map_sqlx;

/// Repository for reservation reads and transaction-scoped writes.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    /// Create a new reservation repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a reservation by ID.
    pub async fn find_by_id(&self, id: ReservationId) -> AppResult<Option<Reservation>> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("Failed to find reservation", e))
    }

    /// A user's seat-holding reservations, newest first.
    pub async fn find_active_by_user(&self, user_id: UserId) -> AppResult<Vec<Reservation>> {
        sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = $1 AND status <> 'cancelled' \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to list user reservations", e))
    }

    /// All reservations whose session starts at or after `from`, ordered by
    /// session start.
    pub async fn find_for_sessions_starting_from(
        &self,
        from: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>> {
        sqlx::query_as::<_, Reservation>(
            "SELECT r.* FROM reservations r \
             JOIN training_sessions s ON s.id = r.session_id \
             WHERE s.starts_at >= $1 \
             ORDER BY s.starts_at ASC, r.created_at ASC",
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to list upcoming reservations", e))
    }

    /// Find a reservation on the caller's connection.
    pub async fn find_in(
        conn: &mut PgConnection,
        id: ReservationId,
    ) -> AppResult<Option<Reservation>> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| map_sqlx("Failed to find reservation", e))
    }

    /// The user's seat-holding reservation for a session, if any.
    pub async fn find_active_for_user_in(
        conn: &mut PgConnection,
        session_id: SessionId,
        user_id: UserId,
    ) -> AppResult<Option<Reservation>> {
        sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations \
             WHERE session_id = $1 AND user_id = $2 AND status <> 'cancelled' LIMIT 1",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| map_sqlx("Failed to check existing reservation", e))
    }

    /// Count seat-holding reservations on the caller's connection.
    pub async fn count_active_in(conn: &mut PgConnection, session_id: SessionId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations WHERE session_id = $1 AND status <> 'cancelled'",
        )
        .bind(session_id)
        .fetch_one(conn)
        .await
        .map_err(|e| map_sqlx("Failed to count reservations", e))
    }

    /// Insert a reservation. A second seat-holding row for the same
    /// (user, session) fails with `ErrorKind::Conflict`.
    pub async fn insert_in(
        conn: &mut PgConnection,
        reservation: &Reservation,
    ) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (id, user_id, session_id, status, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(reservation.id)
        .bind(reservation.user_id)
        .bind(reservation.session_id)
        .bind(reservation.status)
        .bind(reservation.created_at)
        .fetch_one(conn)
        .await
        .map_err(|e| map_sqlx("Failed to insert reservation", e))
    }

    /// Hard-delete a reservation.
    pub async fn delete_in(conn: &mut PgConnection, id: ReservationId) -> AppResult<bool> {
        sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map(|r| r.rows_affected() > 0)
            .map_err(|e| map_sqlx("Failed to delete reservation", e))
    }

    /// Overwrite a reservation's status.
    pub async fn update_status_in(
        conn: &mut PgConnection,
        id: ReservationId,
        status: ReservationStatus,
    ) -> AppResult<bool> {
        sqlx::query("UPDATE reservations SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(conn)
            .await
            .map(|r| r.rows_affected() > 0)
            .map_err(|e| map_sqlx("Failed to update reservation status", e))
    }
}
