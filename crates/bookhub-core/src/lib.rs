//! # bookhub-core
//!
//! Core crate for BookHub. Contains the unified error system, configuration
//! schemas, typed identifiers, and the clock abstraction used by every
//! time-relative admission rule.
//!
//! This crate has **no** internal dependencies on other BookHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
