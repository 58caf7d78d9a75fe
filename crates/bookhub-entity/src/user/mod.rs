//! User identity as seen by the booking core.

pub mod requester;
pub mod role;

pub use requester::Requester;
pub use role::UserRole;
