//! # bookhub-database
//!
//! PostgreSQL database connection management and concrete repository
//! implementations for BookHub sessions and reservations.
//!
//! Repository methods come in two shapes: pool-backed methods for reads
//! that need no isolation, and `*_in` associated functions that run on a
//! caller-owned connection so the admission core can group them into one
//! transaction.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
