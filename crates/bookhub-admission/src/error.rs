//! Closed error enums for the admission and lifecycle operations.
//!
//! Every variant except `Unavailable` is an expected, user-facing business
//! outcome. `Unavailable` wraps the storage fault that caused it and is the
//! only variant that represents a system failure. Both enums map cleanly to
//! [`bookhub_core::error::AppError`].

use thiserror::Error;

use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::types::{ReservationId, SessionId, UserId};

/// Why a reservation request was not admitted.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// The session does not exist.
    #[error("Session {session_id} not found")]
    NotFound {
        /// The requested session.
        session_id: SessionId,
    },

    /// The session has already started.
    #[error("Session {session_id} is closed for registration")]
    Closed {
        /// The requested session.
        session_id: SessionId,
    },

    /// The subject already holds a seat in the session.
    #[error("User {user_id} is already registered for session {session_id}")]
    DuplicateReservation {
        /// The subject.
        user_id: UserId,
        /// The requested session.
        session_id: SessionId,
    },

    /// Every seat is taken.
    #[error("Session {session_id} is full ({capacity} seats)")]
    Full {
        /// The requested session.
        session_id: SessionId,
        /// The session's capacity at decision time.
        capacity: i32,
    },

    /// The store failed.
    #[error("Reservation store unavailable: {0}")]
    Unavailable(#[from] AppError),
}

impl AdmissionError {
    /// The unified error kind for this outcome.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Closed { .. } | Self::DuplicateReservation { .. } | Self::Full { .. } => {
                ErrorKind::Conflict
            }
            Self::Unavailable(inner) => inner.kind,
        }
    }

    /// Whether this is a system fault rather than a business rejection.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<AdmissionError> for AppError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Unavailable(inner) => inner,
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}

/// Why a cancellation or status change was rejected.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The reservation does not exist.
    #[error("Reservation {reservation_id} not found")]
    NotFound {
        /// The requested reservation.
        reservation_id: ReservationId,
    },

    /// The requester may not act on this reservation.
    #[error("User {user_id} may not modify reservation {reservation_id}")]
    Forbidden {
        /// The requested reservation.
        reservation_id: ReservationId,
        /// The requester.
        user_id: UserId,
    },

    /// The session has already started.
    #[error("Session {session_id} has already started")]
    SessionStarted {
        /// The reservation's session.
        session_id: SessionId,
    },

    /// The requested status is not one of pending, confirmed, cancelled.
    #[error("Invalid reservation status '{value}'")]
    InvalidStatus {
        /// The raw value supplied by the caller.
        value: String,
    },

    /// Re-activating the reservation would exceed the session's capacity.
    #[error("Session {session_id} is full ({capacity} seats)")]
    Full {
        /// The reservation's session.
        session_id: SessionId,
        /// The session's capacity at decision time.
        capacity: i32,
    },

    /// Re-activating the reservation would give the subject a second seat.
    #[error("User {user_id} already holds a reservation for session {session_id}")]
    DuplicateReservation {
        /// The subject.
        user_id: UserId,
        /// The reservation's session.
        session_id: SessionId,
    },

    /// The store failed.
    #[error("Reservation store unavailable: {0}")]
    Unavailable(#[from] AppError),
}

impl LifecycleError {
    /// The unified error kind for this outcome.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Authorization,
            Self::InvalidStatus { .. } => ErrorKind::Validation,
            Self::SessionStarted { .. } | Self::Full { .. } | Self::DuplicateReservation { .. } => {
                ErrorKind::Conflict
            }
            Self::Unavailable(inner) => inner.kind,
        }
    }

    /// Whether this is a system fault rather than a business rejection.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Unavailable(inner) => inner,
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}
