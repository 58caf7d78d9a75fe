//! Read-side views over reservations.

pub mod queries;

pub use queries::ReservationQueries;
