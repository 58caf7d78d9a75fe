//! The identity on whose behalf an operation runs.

use serde::{Deserialize, Serialize};

use bookhub_core::types::UserId;

use super::role::UserRole;

/// Authenticated caller identity supplied by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// The user's role.
    pub role: UserRole,
}

impl Requester {
    /// Creates a requester.
    pub fn new(user_id: UserId, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// An employee requester.
    pub fn employee(user_id: UserId) -> Self {
        Self::new(user_id, UserRole::Employee)
    }

    /// An administrator requester.
    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, UserRole::Admin)
    }

    /// Returns whether the requester holds administrative capability.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether the requester may act on a reservation owned by `owner`.
    pub fn may_act_for(&self, owner: UserId) -> bool {
        self.is_admin() || self.user_id == owner
    }
}
