/// Request extractors shared by the route handlers
///
/// - [`CurrentUser`]: the local user behind the verified bearer token,
///   provisioned on first sight
/// - [`ValidatedJson`]: a JSON body that has passed its `validator` rules,
///   rejecting with the API's JSON error shape instead of plain text

use crate::{app::AppState, error::ApiError};
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use ownerpulse_shared::identity::{resolve_or_create, IdentityAssertion};
use ownerpulse_shared::models::user::User;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use validator::Validate;

/// The caller's local user record
///
/// Only usable on routes behind the authentication layer, which stores the
/// verified [`IdentityAssertion`] in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let assertion = parts
            .extensions
            .get::<IdentityAssertion>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

        let user = resolve_or_create(&state.db, &assertion).await?;

        if !user.is_active {
            return Err(ApiError::Forbidden("Account is deactivated".to_string()));
        }

        Ok(CurrentUser(user))
    }
}

/// JSON body that deserialized and validated cleanly
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Distinguishes an absent field from an explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent is `None`, `null` is `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
