//! # bookhub-service
//!
//! Application services around the admission core. Each service receives
//! its store and clock at construction time via `Arc` references and
//! reports failures as [`bookhub_core::AppError`].

pub mod access;
pub mod reservation;
pub mod session;

pub use reservation::ReservationQueries;
pub use session::SessionDirectory;
