/// User endpoints
///
/// # Endpoints
///
/// - `POST /users` - Create a user record (public)
/// - `GET /users/profile` - Caller's own record, provisioned on first call
/// - `PATCH /users/profile` - Update the caller's contact details
/// - `GET /users` - List users (admin)
/// - `GET /users/:id` - Fetch a user (self or admin)
/// - `PATCH /users/:id` - Update a user (self or admin)
/// - `DELETE /users/:id` - Delete a user (self or admin)
///
/// Only admins may change `role` or `isActive`. The identity-provider
/// subject (`auth0Id`) is fixed at creation and never accepted in updates.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{nullable, CurrentUser, ValidatedJson},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use ownerpulse_shared::{
    auth::authorization::{require_admin, require_self_or_admin, require_update_allowed},
    models::user::{CreateUser, UpdateUser, User, UserRole},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

/// Create user request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    /// Identity-provider subject, e.g. `auth0|abc123`
    #[validate(length(min = 1, max = 255, message = "Auth0 id is required"))]
    pub auth0_id: String,

    /// Only `owner` is accepted on this public endpoint
    pub role: Option<UserRole>,
}

/// Profile update request; role and status are not editable here
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,

    /// `null` clears the phone number
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
}

/// User update request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,

    /// Admin only
    pub role: Option<UserRole>,

    /// Admin only
    pub is_active: Option<bool>,
}

impl From<UpdateProfileRequest> for UpdateUser {
    fn from(req: UpdateProfileRequest) -> Self {
        UpdateUser {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            ..Default::default()
        }
    }
}

impl From<UpdateUserRequest> for UpdateUser {
    fn from(req: UpdateUserRequest) -> Self {
        UpdateUser {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            role: req.role,
            is_active: req.is_active,
        }
    }
}

/// Pagination for the admin listing
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListUsersQuery {
    /// Clamps to `1..=100` (default 50) and a non-negative offset
    pub fn bounds(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

fn check_phone(phone: &Option<Option<String>>) -> ApiResult<()> {
    if let Some(Some(p)) = phone {
        if p.len() > 32 {
            return Err(ApiError::invalid("phone", "Phone must be at most 32 characters"));
        }
    }
    Ok(())
}

/// Create user handler
///
/// # Endpoint
///
/// ```text
/// POST /users
/// ```
///
/// # Response
///
/// 201 with the created user.
///
/// # Errors
///
/// - 403: `role` other than `owner` requested
/// - 409: email or Auth0 id already exists
/// - 422: validation failed
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let role = req.role.unwrap_or_default();
    if role != UserRole::Owner {
        return Err(ApiError::Forbidden(
            "Only owner accounts can be created here".to_string(),
        ));
    }

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            auth0_id: req.auth0_id,
            role,
        },
    )
    .await?;

    info!(user_id = %user.id, "User created");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Returns the caller's own record
///
/// # Endpoint
///
/// ```text
/// GET /users/profile
/// ```
///
/// The first call for a new identity creates the user; later calls return
/// the same record without syncing provider-side changes.
pub async fn get_profile(CurrentUser(user): CurrentUser) -> ApiResult<Json<User>> {
    Ok(Json(user))
}

/// Updates the caller's own contact details
///
/// # Endpoint
///
/// ```text
/// PATCH /users/profile
/// ```
///
/// # Errors
///
/// - 409: email already in use
/// - 422: validation failed
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    check_phone(&req.phone)?;

    let user = User::update(&state.db, caller.id, req.into())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Lists users, newest first
///
/// # Endpoint
///
/// ```text
/// GET /users?limit=50&offset=0
/// ```
///
/// # Errors
///
/// - 403: caller is not an admin
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Vec<User>>> {
    require_admin(&caller)?;

    let (limit, offset) = query.bounds();
    let users = User::list(&state.db, limit, offset).await?;

    Ok(Json(users))
}

/// Fetches a single user
///
/// # Errors
///
/// - 403: neither the user nor an admin
/// - 404: user not found
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    require_self_or_admin(&caller, id)?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Partially updates a user
///
/// # Errors
///
/// - 403: neither the user nor an admin, or a non-admin touching role/status
/// - 404: user not found
/// - 409: email already in use
/// - 422: validation failed
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    require_self_or_admin(&caller, id)?;
    check_phone(&req.phone)?;

    let update: UpdateUser = req.into();
    require_update_allowed(&caller, &update)?;

    let user = User::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(user_id = %user.id, updated_by = %caller.id, "User updated");

    Ok(Json(user))
}

/// Deletes a user
///
/// # Errors
///
/// - 403: neither the user nor an admin
/// - 404: user not found
/// - 409: the user still owns properties
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_self_or_admin(&caller, id)?;

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(user_id = %id, deleted_by = %caller.id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_bounds() {
        assert_eq!(ListUsersQuery::default().bounds(), (50, 0));
        assert_eq!(
            ListUsersQuery { limit: Some(1000), offset: Some(-5) }.bounds(),
            (100, 0)
        );
        assert_eq!(
            ListUsersQuery { limit: Some(0), offset: Some(20) }.bounds(),
            (1, 20)
        );
    }

    #[test]
    fn test_update_request_mapping() {
        let req: UpdateUserRequest = serde_json::from_str(
            r#"{"firstName":"Jo","phone":null,"role":"admin","isActive":false,"auth0Id":"x"}"#,
        )
        .unwrap();

        let update: UpdateUser = req.into();
        assert_eq!(update.first_name.as_deref(), Some("Jo"));
        assert_eq!(update.phone, Some(None));
        assert_eq!(update.role, Some(UserRole::Admin));
        assert_eq!(update.is_active, Some(false));
        assert!(update.email.is_none());
    }

    #[test]
    fn test_profile_request_ignores_role() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"lastName":"Doe","role":"admin"}"#).unwrap();

        let update: UpdateUser = req.into();
        assert_eq!(update.last_name.as_deref(), Some("Doe"));
        assert!(update.role.is_none());
        assert!(update.phone.is_none());
    }

    #[test]
    fn test_create_request_validation() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"email":"not-an-email","firstName":"","lastName":"Doe","auth0Id":"auth0|1"}"#,
        )
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("first_name"));
    }
}
