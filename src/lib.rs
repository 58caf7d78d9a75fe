//! # bookhub
//!
//! Capacity-bounded reservation admission for the BookHub training booking
//! platform. This crate wires the workspace together: it installs logging,
//! selects the reservation store named by the configuration, and hands out
//! the services a presentation layer calls into.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use bookhub_admission::{
    AdmissionEngine, LifecycleManager, MemoryReservationStore, PgReservationStore,
    ReservationStore,
};
use bookhub_core::config::{AppConfig, LoggingConfig, StoreBackend};
use bookhub_core::error::AppError;
use bookhub_core::traits::{Clock, SystemClock};
use bookhub_database::DatabasePool;
use bookhub_database::migration::run_migrations;
use bookhub_service::{ReservationQueries, SessionDirectory};

pub use bookhub_admission::{AdmissionError, LifecycleError};
pub use bookhub_core::{AppResult, config, error, traits, types};
pub use bookhub_entity as entity;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`. Fails if a subscriber
/// is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = match config.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
        _ => fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    installed.map_err(|e| AppError::internal(format!("Failed to install logger: {e}")))
}

/// The assembled booking core.
#[derive(Debug, Clone)]
pub struct BookingCore {
    /// Admits subjects to sessions.
    pub engine: AdmissionEngine,
    /// Cancels reservations and changes their status.
    pub lifecycle: LifecycleManager,
    /// Manages the session catalog.
    pub directory: SessionDirectory,
    /// Reservation listings.
    pub queries: ReservationQueries,
    store: Arc<dyn ReservationStore>,
}

impl BookingCore {
    /// Build the core from configuration with the system clock.
    ///
    /// For the PostgreSQL backend this connects the pool and, unless
    /// disabled, applies the embedded migrations.
    pub async fn bootstrap(config: &AppConfig) -> Result<Self, AppError> {
        let store: Arc<dyn ReservationStore> = match config.store.backend {
            StoreBackend::Memory => {
                info!("Using in-memory reservation store");
                Arc::new(MemoryReservationStore::new())
            }
            StoreBackend::Postgres => {
                info!("Connecting to database...");
                let db = DatabasePool::connect(&config.database).await?;

                if config.store.run_migrations {
                    run_migrations(db.pool()).await?;
                }

                Arc::new(PgReservationStore::new(db))
            }
        };

        info!(backend = %config.store.backend, "Booking core ready");
        Ok(Self::with_store(store, Arc::new(SystemClock)))
    }

    /// Build the core over an existing store and clock.
    pub fn with_store(store: Arc<dyn ReservationStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine: AdmissionEngine::new(store.clone(), clock.clone()),
            lifecycle: LifecycleManager::new(store.clone(), clock.clone()),
            directory: SessionDirectory::new(store.clone()),
            queries: ReservationQueries::new(store.clone(), clock),
            store,
        }
    }

    /// The shared reservation store.
    pub fn store(&self) -> &Arc<dyn ReservationStore> {
        &self.store
    }

    /// Check that the backing store is reachable.
    pub async fn health_check(&self) -> Result<bool, AppError> {
        self.store.health_check().await
    }
}
