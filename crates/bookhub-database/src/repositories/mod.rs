//! Repository implementations for BookHub entities.

pub mod reservation;
pub mod session;

pub use reservation::ReservationRepository;
pub use session::SessionRepository;

use bookhub_core::error::{AppError, ErrorKind};

/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Map a sqlx failure into an [`AppError`].
///
/// Pool exhaustion, lost connections and lock wait timeouts become
/// `ServiceUnavailable`; unique violations become `Conflict`; everything
/// else is `Database`.
pub fn map_sqlx(context: &str, err: sqlx::Error) -> AppError {
    AppError::with_source(kind_of(&err), format!("{context}: {err}"), err)
}

fn kind_of(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            ErrorKind::ServiceUnavailable
        }
        sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::Conflict,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(LOCK_NOT_AVAILABLE) => {
            ErrorKind::ServiceUnavailable
        }
        _ => ErrorKind::Database,
    }
}
