//! Training session repository implementation.

use std::time::Duration;

use chrono::Utc;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use bookhub_core::result::AppResult;
use bookhub_core::types::SessionId;
use bookhub_entity::session::{NewSession, Session, SessionSummary};

use super::map_sqlx;

const SUMMARY_SELECT: &str = "SELECT s.*, \
     COUNT(r.id) FILTER (WHERE r.status <> 'cancelled') AS occupancy \
     FROM training_sessions s \
     LEFT JOIN reservations r ON r.session_id = s.id";

#[derive(FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    session: Session,
    occupancy: i64,
}

impl From<SummaryRow> for SessionSummary {
    fn from(row: SummaryRow) -> Self {
        SessionSummary::new(row.session, row.occupancy)
    }
}

/// Repository for training session CRUD operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a session with its current occupancy.
    pub async fn find_summary(&self, id: SessionId) -> AppResult<Option<SessionSummary>> {
        sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT} WHERE s.id = $1 GROUP BY s.id"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(SessionSummary::from))
        .map_err(|e| map_sqlx("Failed to load session summary", e))
    }

    /// List every session with its occupancy, earliest start first.
    pub async fn find_all_summaries(&self) -> AppResult<Vec<SessionSummary>> {
        sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT} GROUP BY s.id ORDER BY s.starts_at ASC, s.id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(SessionSummary::from).collect())
        .map_err(|e| map_sqlx("Failed to list sessions", e))
    }

    /// Load summaries for a set of sessions.
    pub async fn find_summaries_by_ids(&self, ids: &[SessionId]) -> AppResult<Vec<SessionSummary>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT} WHERE s.id = ANY($1) GROUP BY s.id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(SessionSummary::from).collect())
        .map_err(|e| map_sqlx("Failed to load session summaries", e))
    }

    /// Create a new session.
    pub async fn create(&self, data: &NewSession) -> AppResult<Session> {
        let now = Utc::now();
        sqlx::query_as::<_, Session>(
            "INSERT INTO training_sessions \
             (id, title, description, location, starts_at, capacity, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING *",
        )
        .bind(SessionId::new())
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.starts_at)
        .bind(data.capacity)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to create session", e))
    }

    /// Replace a session's editable fields. Returns `None` if it does not exist.
    pub async fn update(&self, id: SessionId, data: &NewSession) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "UPDATE training_sessions SET title = $2, description = $3, location = $4, \
             starts_at = $5, capacity = $6, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.starts_at)
        .bind(data.capacity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to update session", e))
    }

    /// Delete a session and, by cascade, its reservations.
    pub async fn delete(&self, id: SessionId) -> AppResult<bool> {
        sqlx::query("DELETE FROM training_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected() > 0)
            .map_err(|e| map_sqlx("Failed to delete session", e))
    }

    /// Lock a session row for the rest of the caller's transaction.
    ///
    /// Every admission, cancellation, and status change on the session
    /// serializes on this lock. The wait is bounded by the transaction's
    /// `lock_timeout`, see [`SessionRepository::set_lock_timeout_in`].
    pub async fn lock_in(conn: &mut PgConnection, id: SessionId) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM training_sessions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| map_sqlx("Failed to lock session", e))
    }

    /// Bound lock waits for the rest of the caller's transaction.
    ///
    /// An expired wait fails with SQLSTATE 55P03, which maps to
    /// `ServiceUnavailable`.
    pub async fn set_lock_timeout_in(conn: &mut PgConnection, timeout: Duration) -> AppResult<()> {
        // SET does not take bind parameters; the value is a plain integer.
        sqlx::query(&format!("SET LOCAL lock_timeout = {}", timeout.as_millis()))
            .execute(conn)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx("Failed to set lock timeout", e))
    }
}
