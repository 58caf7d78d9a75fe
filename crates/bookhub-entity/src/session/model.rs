//! Training session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use bookhub_core::types::SessionId;

/// A scheduled session with a fixed number of seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Where the session takes place.
    pub location: String,
    /// When the session starts. Admission and cancellation close at this instant.
    pub starts_at: DateTime<Utc>,
    /// Maximum number of non-cancelled reservations at admission time.
    pub capacity: i32,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has started at `now`. A session starting exactly
    /// at `now` counts as started.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now
    }

    /// Whether `occupancy` leaves at least one free seat.
    pub fn has_room_for(&self, occupancy: i64) -> bool {
        occupancy < i64::from(self.capacity)
    }
}

/// Data required to create or replace a session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSession {
    /// Display title.
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    /// Free-form description.
    #[validate(length(min = 1))]
    pub description: String,
    /// Location.
    #[validate(length(min = 1, max = 255))]
    pub location: String,
    /// Start instant.
    pub starts_at: DateTime<Utc>,
    /// Seat count, at least one.
    #[validate(range(min = 1))]
    pub capacity: i32,
}
