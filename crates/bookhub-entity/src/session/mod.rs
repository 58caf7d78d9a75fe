//! Training session entities.

pub mod model;
pub mod summary;

pub use model::{NewSession, Session};
pub use summary::SessionSummary;
