//! Cancellation and administrative status changes.

use std::sync::Arc;

use tracing::{debug, error, info};

use bookhub_core::traits::Clock;
use bookhub_core::types::ReservationId;
use bookhub_entity::reservation::{Reservation, ReservationStatus};
use bookhub_entity::user::Requester;

use crate::error::LifecycleError;
use crate::store::{ReservationStore, SessionTransaction};

/// Mutates existing reservations.
///
/// Each operation locates the reservation, opens a transaction on its
/// session and re-reads the row under the lock before deciding.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    /// Reservation store.
    store: Arc<dyn ReservationStore>,
    /// Time source for the cancellation window.
    clock: Arc<dyn Clock>,
}

impl LifecycleManager {
    /// Creates a new lifecycle manager.
    pub fn new(store: Arc<dyn ReservationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Cancel a reservation by deleting it, freeing its seat.
    ///
    /// Only the subject or an administrator may cancel, and only before the
    /// session starts.
    pub async fn cancel(
        &self,
        reservation_id: ReservationId,
        requester: &Requester,
    ) -> Result<(), LifecycleError> {
        let result = self.try_cancel(reservation_id, requester).await;
        log_outcome("cancel", reservation_id, requester, &result);
        result
    }

    /// Overwrite a reservation's status. Administrators only.
    ///
    /// `new_status` is the caller's raw value. Moving a cancelled
    /// reservation back to a seat-holding status re-checks capacity and
    /// uniqueness under the session lock.
    pub async fn set_status(
        &self,
        reservation_id: ReservationId,
        new_status: &str,
        requester: &Requester,
    ) -> Result<(), LifecycleError> {
        let result = self
            .try_set_status(reservation_id, new_status, requester)
            .await;
        log_outcome("set_status", reservation_id, requester, &result);
        result
    }

    async fn try_cancel(
        &self,
        reservation_id: ReservationId,
        requester: &Requester,
    ) -> Result<(), LifecycleError> {
        let (mut tx, current) = self.open(reservation_id).await?;

        if !requester.may_act_for(current.user_id) {
            return Err(LifecycleError::Forbidden {
                reservation_id,
                user_id: requester.user_id,
            });
        }

        let now = self.clock.now();
        if tx.session().has_started(now) {
            return Err(LifecycleError::SessionStarted {
                session_id: current.session_id,
            });
        }

        if !tx.delete(reservation_id).await? {
            return Err(LifecycleError::NotFound { reservation_id });
        }

        tx.commit().await?;
        Ok(())
    }

    async fn try_set_status(
        &self,
        reservation_id: ReservationId,
        new_status: &str,
        requester: &Requester,
    ) -> Result<(), LifecycleError> {
        if !requester.is_admin() {
            return Err(LifecycleError::Forbidden {
                reservation_id,
                user_id: requester.user_id,
            });
        }

        let status: ReservationStatus =
            new_status.parse().map_err(|_| LifecycleError::InvalidStatus {
                value: new_status.to_string(),
            })?;

        let (mut tx, current) = self.open(reservation_id).await?;

        if current.status == status {
            return Ok(());
        }

        if status.holds_seat() && !current.is_active() {
            if tx.find_active_for_user(current.user_id).await?.is_some() {
                return Err(LifecycleError::DuplicateReservation {
                    user_id: current.user_id,
                    session_id: current.session_id,
                });
            }

            let occupancy = tx.occupancy().await?;
            if !tx.session().has_room_for(occupancy) {
                return Err(LifecycleError::Full {
                    session_id: current.session_id,
                    capacity: tx.session().capacity,
                });
            }
        }

        match tx.update_status(reservation_id, status).await {
            Ok(true) => {}
            Ok(false) => return Err(LifecycleError::NotFound { reservation_id }),
            Err(e) if e.is_conflict() => {
                return Err(LifecycleError::DuplicateReservation {
                    user_id: current.user_id,
                    session_id: current.session_id,
                });
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(())
    }

    /// Locate a reservation, lock its session, and re-read it under the lock.
    async fn open(
        &self,
        reservation_id: ReservationId,
    ) -> Result<(Box<dyn SessionTransaction>, Reservation), LifecycleError> {
        let not_found = LifecycleError::NotFound { reservation_id };

        let Some(located) = self.store.find_reservation(reservation_id).await? else {
            return Err(not_found);
        };
        let Some(mut tx) = self.store.begin(located.session_id).await? else {
            return Err(not_found);
        };
        let Some(current) = tx.find_reservation(reservation_id).await? else {
            return Err(not_found);
        };

        Ok((tx, current))
    }
}

fn log_outcome(
    operation: &str,
    reservation_id: ReservationId,
    requester: &Requester,
    result: &Result<(), LifecycleError>,
) {
    match result {
        Ok(()) => info!(
            operation,
            reservation_id = %reservation_id,
            requester = %requester.user_id,
            "Reservation updated"
        ),
        Err(LifecycleError::Unavailable(e)) => error!(
            operation,
            reservation_id = %reservation_id,
            error = %e,
            "Reservation update failed: store unavailable"
        ),
        Err(e) => debug!(
            operation,
            reservation_id = %reservation_id,
            requester = %requester.user_id,
            reason = %e,
            "Reservation update rejected"
        ),
    }
}
