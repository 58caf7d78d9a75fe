//! Session plus its derived occupancy.

use serde::{Deserialize, Serialize};

use super::model::Session;

/// A session together with the number of seats currently held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// The session.
    pub session: Session,
    /// Count of non-cancelled reservations.
    pub occupancy: i64,
}

impl SessionSummary {
    /// Creates a summary.
    pub fn new(session: Session, occupancy: i64) -> Self {
        Self { session, occupancy }
    }

    /// Seats left, zero when the session is full or over capacity.
    pub fn remaining(&self) -> i64 {
        (i64::from(self.session.capacity) - self.occupancy).max(0)
    }

    /// Whether no seat is left.
    pub fn is_full(&self) -> bool {
        !self.session.has_room_for(self.occupancy)
    }

    /// The `"N/capacity"` label shown next to a session.
    pub fn label(&self) -> String {
        format!("{}/{}", self.occupancy, self.session.capacity)
    }
}
