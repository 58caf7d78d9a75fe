//! # bookhub-admission
//!
//! The capacity-bounded reservation admission core.
//!
//! ## Modules
//!
//! - `engine`: atomic check-and-reserve admission of a subject to a session
//! - `lifecycle`: cancellation and administrative status changes
//! - `store`: the transactional storage abstraction and its in-memory and
//!   PostgreSQL implementations
//! - `error`: closed per-operation error enums

pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod store;

pub use engine::AdmissionEngine;
pub use error::{AdmissionError, LifecycleError};
pub use lifecycle::LifecycleManager;
#[cfg(feature = "postgres")]
pub use store::postgres::PgReservationStore;
pub use store::{MemoryReservationStore, ReservationStore, SessionTransaction};
