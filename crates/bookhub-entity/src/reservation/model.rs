//! Reservation entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use bookhub_core::types::{ReservationId, SessionId, UserId};

use super::status::ReservationStatus;
use crate::session::SessionSummary;

/// A subject's claim on one seat of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    /// Unique reservation identifier.
    pub id: ReservationId,
    /// The user holding the reservation.
    pub user_id: UserId,
    /// The reserved session.
    pub session_id: SessionId,
    /// Current status.
    pub status: ReservationStatus,
    /// Admission decision instant.
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether this reservation counts towards occupancy.
    pub fn is_active(&self) -> bool {
        self.status.holds_seat()
    }
}

/// Data required to persist a newly admitted reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReservation {
    /// The subject.
    pub user_id: UserId,
    /// The session.
    pub session_id: SessionId,
    /// Initial status.
    pub status: ReservationStatus,
    /// Admission decision instant.
    pub created_at: DateTime<Utc>,
}

impl NewReservation {
    /// A confirmed reservation admitted at `now`.
    pub fn confirmed(user_id: UserId, session_id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            session_id,
            status: ReservationStatus::Confirmed,
            created_at: now,
        }
    }

    /// Materializes the row with a fresh identifier.
    pub fn into_reservation(self) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            user_id: self.user_id,
            session_id: self.session_id,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// A reservation joined with its session and the session's occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDetail {
    /// The reservation.
    pub reservation: Reservation,
    /// The reserved session.
    pub session: SessionSummary,
}
