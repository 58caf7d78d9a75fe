//! Role checks shared by the services.

use bookhub_core::error::AppError;
use bookhub_entity::user::Requester;

/// Fails with an authorization error unless the requester is an administrator.
pub fn require_admin(requester: &Requester, action: &str) -> Result<(), AppError> {
    if requester.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Role '{}' may not {action}",
            requester.role
        )))
    }
}
