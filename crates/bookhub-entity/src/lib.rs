//! # bookhub-entity
//!
//! Domain entity models for BookHub. Every struct in this crate represents
//! a database table row or a domain value object. Database entities derive
//! `sqlx::FromRow`.

pub mod reservation;
pub mod session;
pub mod user;
