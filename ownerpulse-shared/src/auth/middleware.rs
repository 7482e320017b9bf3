/// Bearer token extraction and request authentication
///
/// Pulls the token out of `Authorization: Bearer <token>`, verifies it and
/// hands back the caller's [`IdentityAssertion`]. The API layer runs this in
/// a `from_fn_with_state` middleware and stores the assertion in request
/// extensions for handlers.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use ownerpulse_shared::auth::jwt::TokenVerifier;
/// use ownerpulse_shared::auth::middleware::authenticate;
///
/// # async fn example(verifier: &TokenVerifier, headers: &HeaderMap) {
/// match authenticate(verifier, headers).await {
///     Ok(identity) => println!("caller: {}", identity.subject),
///     Err(e) => println!("rejected: {}", e),
/// }
/// # }
/// ```

use axum::http::{header, HeaderMap};

use super::jwt::{JwtError, TokenVerifier};
use crate::identity::IdentityAssertion;

/// Error type for request authentication
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token failed verification
    #[error(transparent)]
    Token(#[from] JwtError),
}

impl AuthError {
    /// True only when the key set was unreachable
    pub fn is_retriable(&self) -> bool {
        matches!(self, AuthError::Token(e) if e.is_retriable())
    }
}

/// Extracts the bearer token from request headers
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Header is not valid ASCII".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidFormat("Expected Bearer token".to_string()));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Empty bearer token".to_string()));
    }

    Ok(token)
}

/// Extracts and verifies the caller's bearer token
pub async fn authenticate(
    verifier: &TokenVerifier,
    headers: &HeaderMap,
) -> Result<IdentityAssertion, AuthError> {
    let token = bearer_token(headers)?;
    let identity = verifier.verify(token).await?;
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Ok("abc"));
    }

    #[test]
    fn test_bearer_token_errors() {
        assert_eq!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        );
        assert!(matches!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer   ")),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_is_retriable() {
        assert!(AuthError::Token(JwtError::KeySetUnavailable("down".to_string())).is_retriable());
        assert!(!AuthError::Token(JwtError::Expired).is_retriable());
        assert!(!AuthError::MissingCredentials.is_retriable());
    }
}
