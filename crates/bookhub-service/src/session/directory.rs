//! Session create, update, delete, and availability listing.

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use bookhub_admission::ReservationStore;
use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::types::SessionId;
use bookhub_entity::session::{NewSession, Session, SessionSummary};
use bookhub_entity::user::Requester;

use crate::access::require_admin;

/// The catalog of sessions the admission engine admits into.
#[derive(Debug, Clone)]
pub struct SessionDirectory {
    /// Reservation store.
    store: Arc<dyn ReservationStore>,
}

impl SessionDirectory {
    /// Creates a new session directory.
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Creates a session (admin).
    pub async fn create_session(
        &self,
        requester: &Requester,
        data: NewSession,
    ) -> Result<Session, AppError> {
        require_admin(requester, "create sessions")?;
        validate(&data)?;

        let session = self.store.create_session(&data).await?;
        info!(
            session_id = %session.id,
            capacity = session.capacity,
            starts_at = %session.starts_at,
            created_by = %requester.user_id,
            "Session created"
        );
        Ok(session)
    }

    /// Replaces a session's details (admin).
    ///
    /// Lowering the capacity below the current occupancy is accepted; the
    /// existing reservations are kept and new admissions are refused until
    /// occupancy drops.
    pub async fn update_session(
        &self,
        requester: &Requester,
        session_id: SessionId,
        data: NewSession,
    ) -> Result<Session, AppError> {
        require_admin(requester, "update sessions")?;
        validate(&data)?;

        let session = self
            .store
            .update_session(session_id, &data)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))?;

        if let Some(summary) = self.store.session_summary(session_id).await? {
            if summary.occupancy > i64::from(session.capacity) {
                warn!(
                    session_id = %session_id,
                    capacity = session.capacity,
                    occupancy = summary.occupancy,
                    "Session capacity lowered below current occupancy"
                );
            }
        }

        info!(session_id = %session_id, updated_by = %requester.user_id, "Session updated");
        Ok(session)
    }

    /// Deletes a session together with its reservations (admin).
    pub async fn delete_session(
        &self,
        requester: &Requester,
        session_id: SessionId,
    ) -> Result<(), AppError> {
        require_admin(requester, "delete sessions")?;

        if !self.store.delete_session(session_id).await? {
            return Err(AppError::not_found("Session not found"));
        }

        info!(session_id = %session_id, deleted_by = %requester.user_id, "Session deleted");
        Ok(())
    }

    /// All sessions with their occupancy, earliest start first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, AppError> {
        self.store.list_session_summaries().await
    }

    /// One session with its occupancy.
    pub async fn availability(&self, session_id: SessionId) -> Result<SessionSummary, AppError> {
        self.store
            .session_summary(session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))
    }
}

fn validate(data: &NewSession) -> Result<(), AppError> {
    data.validate().map_err(|e| {
        AppError::with_source(ErrorKind::Validation, format!("Invalid session: {e}"), e)
    })
}
