//! Atomic check-and-reserve admission.

use std::sync::Arc;

use tracing::{debug, error, info};

use bookhub_core::traits::Clock;
use bookhub_core::types::{SessionId, UserId};
use bookhub_entity::reservation::{NewReservation, Reservation};

use crate::error::AdmissionError;
use crate::store::ReservationStore;

/// Decides whether a subject may take a seat in a session.
///
/// Every decision runs inside one [`crate::store::SessionTransaction`], so
/// the existence, time window, uniqueness and capacity checks see the same
/// state the insert is applied to. Concurrent requests for the same session
/// are admitted in commit order; there is no queueing.
#[derive(Debug, Clone)]
pub struct AdmissionEngine {
    /// Reservation store.
    store: Arc<dyn ReservationStore>,
    /// Time source for the registration window.
    clock: Arc<dyn Clock>,
}

impl AdmissionEngine {
    /// Creates a new admission engine.
    pub fn new(store: Arc<dyn ReservationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Admit `subject` to `session_id`, creating a confirmed reservation.
    ///
    /// Checks, in order: the session exists, it has not started, the subject
    /// holds no seat in it yet, and occupancy is below capacity. Either the
    /// reservation is committed or nothing is written.
    pub async fn admit(
        &self,
        subject: UserId,
        session_id: SessionId,
    ) -> Result<Reservation, AdmissionError> {
        let result = self.try_admit(subject, session_id).await;

        match &result {
            Ok(reservation) => info!(
                reservation_id = %reservation.id,
                user_id = %subject,
                session_id = %session_id,
                "Reservation admitted"
            ),
            Err(AdmissionError::Unavailable(e)) => error!(
                user_id = %subject,
                session_id = %session_id,
                error = %e,
                "Admission failed: reservation store unavailable"
            ),
            Err(e) => debug!(
                user_id = %subject,
                session_id = %session_id,
                reason = %e,
                "Admission rejected"
            ),
        }

        result
    }

    async fn try_admit(
        &self,
        subject: UserId,
        session_id: SessionId,
    ) -> Result<Reservation, AdmissionError> {
        let Some(mut tx) = self.store.begin(session_id).await? else {
            return Err(AdmissionError::NotFound { session_id });
        };

        // Read after the lock is held so the window check matches the commit.
        let now = self.clock.now();
        let session = tx.session().clone();

        if session.has_started(now) {
            return Err(AdmissionError::Closed { session_id });
        }

        if tx.find_active_for_user(subject).await?.is_some() {
            return Err(AdmissionError::DuplicateReservation {
                user_id: subject,
                session_id,
            });
        }

        let occupancy = tx.occupancy().await?;
        if !session.has_room_for(occupancy) {
            return Err(AdmissionError::Full {
                session_id,
                capacity: session.capacity,
            });
        }

        let reservation = match tx
            .insert(NewReservation::confirmed(subject, session_id, now))
            .await
        {
            Ok(reservation) => reservation,
            Err(e) if e.is_conflict() => {
                return Err(AdmissionError::DuplicateReservation {
                    user_id: subject,
                    session_id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        Ok(reservation)
    }

    /// Number of seat-holding reservations in a session.
    pub async fn occupancy(&self, session_id: SessionId) -> Result<i64, AdmissionError> {
        match self.store.session_summary(session_id).await {
            Ok(Some(summary)) => Ok(summary.occupancy),
            Ok(None) => Err(AdmissionError::NotFound { session_id }),
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Failed to read occupancy");
                Err(e.into())
            }
        }
    }
}
