/// Ownership and role checks
///
/// # Permission Model
///
/// 1. **Ownership**: properties belong to one user; bookings and work orders
///    inherit their property's owner. Non-owned resources are reported as
///    not found so callers can't probe identifiers.
/// 2. **Self-or-admin**: user records are visible to the user themselves and
///    to admins.
/// 3. **Admin-only**: listing all users and changing role or active status.
///
/// # Example
///
/// ```no_run
/// use ownerpulse_shared::auth::authorization::{require_property_owner, require_self_or_admin};
/// use ownerpulse_shared::models::user::User;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, caller: User, property_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let property = require_property_owner(&pool, &caller, property_id).await?;
/// require_self_or_admin(&caller, property.owner_id)?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::property::Property;
use crate::models::user::{UpdateUser, User};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Resource missing or not owned by the caller
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Caller may not act on this record
    #[error("Not authorized to access this resource")]
    NotAuthorized,

    /// Operation needs the admin role
    #[error("Admin role required")]
    AdminRequired,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Loads a property only if the caller owns it
pub async fn require_property_owner(
    pool: &PgPool,
    caller: &User,
    property_id: Uuid,
) -> Result<Property, AuthzError> {
    Property::find_owned(pool, property_id, caller.id)
        .await?
        .ok_or(AuthzError::NotFound("Property"))
}

/// Allows the user themselves or any admin
pub fn require_self_or_admin(caller: &User, target_user_id: Uuid) -> Result<(), AuthzError> {
    if caller.id == target_user_id || caller.is_admin() {
        return Ok(());
    }

    Err(AuthzError::NotAuthorized)
}

pub fn require_admin(caller: &User) -> Result<(), AuthzError> {
    if caller.is_admin() {
        return Ok(());
    }

    Err(AuthzError::AdminRequired)
}

/// Role and active status may only be changed by admins
pub fn require_update_allowed(caller: &User, update: &UpdateUser) -> Result<(), AuthzError> {
    if update.role.is_some() || update.is_active.is_some() {
        require_admin(caller)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use chrono::Utc;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            first_name: "Some".to_string(),
            last_name: "One".to_string(),
            phone: None,
            auth0_id: format!("auth0|{}", Uuid::new_v4()),
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_require_self_or_admin() {
        let owner = user(UserRole::Owner);
        let admin = user(UserRole::Admin);

        assert!(require_self_or_admin(&owner, owner.id).is_ok());
        assert!(matches!(
            require_self_or_admin(&owner, admin.id),
            Err(AuthzError::NotAuthorized)
        ));
        assert!(require_self_or_admin(&admin, owner.id).is_ok());
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&user(UserRole::Admin)).is_ok());
        assert!(matches!(
            require_admin(&user(UserRole::Owner)),
            Err(AuthzError::AdminRequired)
        ));
    }

    #[test]
    fn test_require_update_allowed() {
        let owner = user(UserRole::Owner);

        let profile_only = UpdateUser {
            first_name: Some("New".to_string()),
            ..Default::default()
        };
        assert!(require_update_allowed(&owner, &profile_only).is_ok());

        let promote = UpdateUser {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        assert!(require_update_allowed(&owner, &promote).is_err());
        assert!(require_update_allowed(&user(UserRole::Admin), &promote).is_ok());

        let deactivate = UpdateUser {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(require_update_allowed(&owner, &deactivate).is_err());
    }

    #[test]
    fn test_authz_error_display() {
        assert_eq!(AuthzError::NotFound("Property").to_string(), "Property not found");
        assert!(AuthzError::NotAuthorized.to_string().contains("Not authorized"));
    }
}
