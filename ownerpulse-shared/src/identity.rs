/// Identity assertions and local user resolution
///
/// A verified access token yields an [`IdentityAssertion`]. The first time a
/// subject is seen, [`resolve_or_create`] provisions a local [`User`] for it;
/// afterwards the existing row is returned unchanged. Provider-side profile
/// changes are not synced back.
///
/// Concurrent first requests for the same subject converge on a single row:
/// the insert is `ON CONFLICT (auth0_id) DO NOTHING` and the loser re-reads
/// the winner's row.
///
/// # Example
///
/// ```no_run
/// use ownerpulse_shared::identity::{resolve_or_create, IdentityAssertion};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let assertion = IdentityAssertion {
///     subject: "auth0|abc123".to_string(),
///     email: Some("jane@example.com".to_string()),
///     name: Some("Jane Doe".to_string()),
///     ..Default::default()
/// };
///
/// let user = resolve_or_create(&pool, &assertion).await?;
/// assert_eq!(user.first_name, "Jane");
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::db;
use crate::models::user::{CreateUser, User, UserRole};

/// Placeholder domain for subjects that carry no email
pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "placeholder.com";

const UNKNOWN_FIRST_NAME: &str = "Unknown";
const UNKNOWN_LAST_NAME: &str = "User";

/// Verified caller identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssertion {
    /// Provider subject id, e.g. `auth0|abc123`
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// Error type for identity resolution
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The token carried no usable subject
    #[error("Identity has no subject")]
    MissingSubject,

    /// Database error, including an email already used by another subject
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Returns the local user for an asserted identity, creating it if needed
///
/// # Errors
///
/// - [`IdentityError::MissingSubject`] for a blank subject
/// - [`IdentityError::Database`] on query failure; a unique violation on
///   `users_email_key` means the email belongs to a different subject
#[instrument(skip(pool, assertion), fields(subject = %assertion.subject))]
pub async fn resolve_or_create(
    pool: &PgPool,
    assertion: &IdentityAssertion,
) -> Result<User, IdentityError> {
    let subject = assertion.subject.trim();
    if subject.is_empty() {
        return Err(IdentityError::MissingSubject);
    }

    if let Some(user) = User::find_by_auth0_id(pool, subject).await? {
        debug!(user_id = %user.id, "Resolved existing user");
        return Ok(user);
    }

    let data = new_user_from(subject, assertion);

    match User::create_if_absent(pool, data).await {
        Ok(Some(user)) => {
            info!(user_id = %user.id, subject, "Provisioned user on first login");
            Ok(user)
        }
        Ok(None) => {
            // Lost the race to a concurrent first login
            debug!(subject, "User created concurrently, re-reading");
            User::find_by_auth0_id(pool, subject)
                .await?
                .ok_or(IdentityError::Database(sqlx::Error::RowNotFound))
        }
        Err(e) if db::error_code(&e).as_deref() == Some(db::UNIQUE_VIOLATION) => {
            // The email index can report the race before the subject index does
            match User::find_by_auth0_id(pool, subject).await? {
                Some(user) => Ok(user),
                None => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Builds the insert for a first-time subject
pub fn new_user_from(subject: &str, assertion: &IdentityAssertion) -> CreateUser {
    let email = assertion
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| placeholder_email(subject));

    let (first_name, last_name) = split_display_name(assertion.name.as_deref());

    CreateUser {
        email,
        first_name,
        last_name,
        phone: None,
        auth0_id: subject.to_string(),
        role: UserRole::Owner,
    }
}

/// `auth0|abc` becomes `auth0_abc@placeholder.com`
pub fn placeholder_email(subject: &str) -> String {
    format!(
        "{}@{}",
        subject.replacen('|', "_", 1),
        PLACEHOLDER_EMAIL_DOMAIN
    )
}

/// Splits a display name on whitespace into first and last name
///
/// The first token is the first name and the rest, joined by single spaces,
/// is the last name. Missing parts fall back to `Unknown` / `User`.
pub fn split_display_name(name: Option<&str>) -> (String, String) {
    let mut parts = name.unwrap_or_default().split_whitespace();

    let first = parts
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_FIRST_NAME.to_string());

    let rest: Vec<&str> = parts.collect();
    let last = if rest.is_empty() {
        UNKNOWN_LAST_NAME.to_string()
    } else {
        rest.join(" ")
    };

    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_email_replaces_first_pipe_only() {
        assert_eq!(placeholder_email("auth0|abc"), "auth0_abc@placeholder.com");
        assert_eq!(
            placeholder_email("oauth2|google|123"),
            "oauth2_google|123@placeholder.com"
        );
        assert_eq!(placeholder_email("plain"), "plain@placeholder.com");
    }

    #[test]
    fn test_split_display_name() {
        assert_eq!(
            split_display_name(Some("Jane Doe")),
            ("Jane".to_string(), "Doe".to_string())
        );
        assert_eq!(
            split_display_name(Some("  Mary   Ann  Smith ")),
            ("Mary".to_string(), "Ann Smith".to_string())
        );
        assert_eq!(
            split_display_name(Some("Cher")),
            ("Cher".to_string(), "User".to_string())
        );
        assert_eq!(
            split_display_name(Some("   ")),
            ("Unknown".to_string(), "User".to_string())
        );
        assert_eq!(
            split_display_name(None),
            ("Unknown".to_string(), "User".to_string())
        );
    }

    #[test]
    fn test_new_user_from_assertion() {
        let assertion = IdentityAssertion {
            subject: "auth0|abc".to_string(),
            email: Some("jane@x.com".to_string()),
            name: Some("Jane Doe".to_string()),
            ..Default::default()
        };

        let data = new_user_from("auth0|abc", &assertion);
        assert_eq!(data.email, "jane@x.com");
        assert_eq!(data.first_name, "Jane");
        assert_eq!(data.last_name, "Doe");
        assert_eq!(data.auth0_id, "auth0|abc");
        assert_eq!(data.role, UserRole::Owner);
        assert!(data.phone.is_none());
    }

    #[test]
    fn test_new_user_without_email_or_name() {
        let assertion = IdentityAssertion {
            subject: "auth0|xyz".to_string(),
            email: Some("  ".to_string()),
            ..Default::default()
        };

        let data = new_user_from("auth0|xyz", &assertion);
        assert_eq!(data.email, "auth0_xyz@placeholder.com");
        assert_eq!(data.first_name, "Unknown");
        assert_eq!(data.last_name, "User");
    }
}
