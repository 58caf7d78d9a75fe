//! "My trainings" and "manage registrations" listings.

use std::sync::Arc;

use tracing::debug;

use bookhub_admission::ReservationStore;
use bookhub_core::error::AppError;
use bookhub_core::traits::Clock;
use bookhub_entity::reservation::ReservationDetail;
use bookhub_entity::user::Requester;

use crate::access::require_admin;

/// Reservation listings for subjects and administrators.
#[derive(Debug, Clone)]
pub struct ReservationQueries {
    /// Reservation store.
    store: Arc<dyn ReservationStore>,
    /// Time source for the "upcoming" cut-off.
    clock: Arc<dyn Clock>,
}

impl ReservationQueries {
    /// Creates a new query service.
    pub fn new(store: Arc<dyn ReservationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The requester's seat-holding reservations, newest first.
    pub async fn my_reservations(
        &self,
        requester: &Requester,
    ) -> Result<Vec<ReservationDetail>, AppError> {
        self.store
            .active_reservations_for_user(requester.user_id)
            .await
    }

    /// Every reservation whose session has not started yet, in session
    /// start order (admin).
    pub async fn upcoming_reservations(
        &self,
        requester: &Requester,
    ) -> Result<Vec<ReservationDetail>, AppError> {
        require_admin(requester, "manage registrations")?;

        let now = self.clock.now();
        let upcoming = self.store.reservations_starting_from(now).await?;
        debug!(count = upcoming.len(), from = %now, "Listed upcoming reservations");
        Ok(upcoming)
    }
}
