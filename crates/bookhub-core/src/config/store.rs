//! Reservation store configuration.

use serde::{Deserialize, Serialize};

/// Which durable store backs the admission core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local store guarded by a mutex. Single node only.
    Memory,
    /// PostgreSQL with row-level session locks and a partial unique index.
    #[default]
    Postgres,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Store selection and startup behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend implementation.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Whether embedded migrations run on startup (postgres only).
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            run_migrations: true,
        }
    }
}

fn default_true() -> bool {
    true
}
