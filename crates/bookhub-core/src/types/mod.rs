//! Shared value types.

pub mod id;

pub use id::{ReservationId, SessionId, UserId};
