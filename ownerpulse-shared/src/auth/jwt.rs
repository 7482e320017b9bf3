/// Access token verification
///
/// Tokens are RS256 JWTs issued by an Auth0 tenant. Verification:
///
/// 1. Decode the header, require a `kid` and `alg = RS256`
/// 2. Look the key up in the [`JwksCache`]
/// 3. Check signature, `exp`, `nbf`, issuer and audience (with leeway)
/// 4. Map the claims onto an [`IdentityAssertion`]
///
/// Only [`JwtError::KeySetUnavailable`] is retriable; everything else means
/// the token itself is unacceptable.
///
/// # Custom Claims
///
/// Auth0 rules add namespaced claims under `https://ownerpulse.com/`:
/// `email`, `roles` and `permissions`.
///
/// # Example
///
/// ```no_run
/// use ownerpulse_shared::auth::jwks::{HttpKeySource, JwksCache};
/// use ownerpulse_shared::auth::jwt::{TokenVerifier, VerifierConfig};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let source = HttpKeySource::for_domain("tenant.us.auth0.com", Duration::from_secs(5))?;
/// let keys = JwksCache::new(Arc::new(source), Duration::from_secs(600), Duration::from_secs(12));
/// let verifier = TokenVerifier::new(
///     keys,
///     VerifierConfig::for_domain("tenant.us.auth0.com", "https://api.ownerpulse.com", 60),
/// );
///
/// let identity = verifier.verify(token).await?;
/// println!("caller: {}", identity.subject);
/// # Ok(())
/// # }
/// ```

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::jwks::JwksCache;
use crate::identity::IdentityAssertion;

/// Namespace for custom claims
pub const CLAIM_NAMESPACE: &str = "https://ownerpulse.com/";

/// Roles assumed when the token carries none
pub const DEFAULT_ROLE: &str = "user";

/// Error type for token verification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwtError {
    #[error("Token header has no key id")]
    MissingKeyId,

    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unknown signing key: {0}")]
    UnknownKey(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token is not yet valid")]
    NotYetValid,

    #[error("Invalid token issuer")]
    InvalidIssuer,

    #[error("Invalid token audience")]
    InvalidAudience,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token is missing required claim: {0}")]
    MissingClaim(String),

    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Signing keys couldn't be fetched
    #[error("Signing keys unavailable: {0}")]
    KeySetUnavailable(String),
}

impl JwtError {
    /// Whether the same token might verify on a later attempt
    pub fn is_retriable(&self) -> bool {
        matches!(self, JwtError::KeySetUnavailable(_))
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::ImmatureSignature => JwtError::NotYetValid,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            ErrorKind::InvalidAudience => JwtError::InvalidAudience,
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            ErrorKind::MissingRequiredClaim(claim) => JwtError::MissingClaim(claim.clone()),
            ErrorKind::InvalidAlgorithm => JwtError::UnsupportedAlgorithm(err.to_string()),
            _ => JwtError::Malformed(err.to_string()),
        }
    }
}

/// Claims read from a verified access token
///
/// `aud`, `iss`, `exp` and `nbf` are validated by the decoder and not kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(
        rename = "https://ownerpulse.com/email",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub namespaced_email: Option<String>,

    #[serde(
        rename = "https://ownerpulse.com/roles",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub roles: Option<Vec<String>>,

    #[serde(
        rename = "https://ownerpulse.com/permissions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub permissions: Option<Vec<String>>,
}

impl From<Claims> for IdentityAssertion {
    fn from(claims: Claims) -> Self {
        let email = claims
            .email
            .or(claims.preferred_username)
            .or(claims.namespaced_email);
        let name = claims.name.or(claims.nickname);

        IdentityAssertion {
            subject: claims.sub.unwrap_or_default(),
            email,
            name,
            picture: claims.picture,
            roles: claims
                .roles
                .unwrap_or_else(|| vec![DEFAULT_ROLE.to_string()]),
            permissions: claims.permissions.unwrap_or_default(),
        }
    }
}

/// Issuer and audience expectations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    pub issuer: String,
    pub audience: String,
    pub leeway_seconds: u64,
}

impl VerifierConfig {
    /// Auth0 issues tokens with `iss = https://{domain}/`
    pub fn for_domain(domain: &str, audience: &str, leeway_seconds: u64) -> Self {
        Self {
            issuer: issuer_for_domain(domain),
            audience: audience.to_string(),
            leeway_seconds,
        }
    }
}

pub fn issuer_for_domain(domain: &str) -> String {
    format!("https://{}/", domain.trim_end_matches('/'))
}

/// Verifies bearer tokens against the provider's published keys
pub struct TokenVerifier {
    keys: JwksCache,
    config: VerifierConfig,
}

impl TokenVerifier {
    pub fn new(keys: JwksCache, config: VerifierConfig) -> Self {
        Self { keys, config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verifies a token and returns the caller's identity
    ///
    /// # Errors
    ///
    /// See [`JwtError`]. The subject is not checked here; a token without one
    /// yields an assertion with an empty subject.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<IdentityAssertion, JwtError> {
        let header = decode_header(token)?;

        if header.alg != Algorithm::RS256 {
            return Err(JwtError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let kid = header.kid.ok_or(JwtError::MissingKeyId)?;

        let jwk = self
            .keys
            .get(&kid)
            .await
            .map_err(|e| JwtError::KeySetUnavailable(e.to_string()))?
            .ok_or_else(|| JwtError::UnknownKey(kid.clone()))?;

        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| JwtError::Malformed(format!("Unusable signing key: {}", e)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        // iss and aud are only compared when present unless required
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = self.config.leeway_seconds;

        let data = decode::<Claims>(token, &key, &validation)?;

        debug!(kid, "Token verified");
        Ok(data.claims.into())
    }
}
