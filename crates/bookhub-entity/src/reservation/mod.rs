//! Reservation entities.

pub mod model;
pub mod status;

pub use model::{NewReservation, Reservation, ReservationDetail};
pub use status::ReservationStatus;
