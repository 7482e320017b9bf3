/// User model and database operations
///
/// A user is the local record for an identity-provider account. It is keyed by
/// the provider's subject id (`auth0_id`), which is unique and never changes
/// once set. Users own properties.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL UNIQUE,
///     first_name TEXT NOT NULL,
///     last_name TEXT NOT NULL,
///     phone TEXT,
///     auth0_id TEXT NOT NULL UNIQUE,
///     role user_role NOT NULL DEFAULT 'owner',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use ownerpulse_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "jane@example.com".to_string(),
///     first_name: "Jane".to_string(),
///     last_name: "Doe".to_string(),
///     phone: None,
///     auth0_id: "auth0|abc123".to_string(),
///     role: UserRole::Owner,
/// }).await?;
///
/// let found = User::find_by_auth0_id(&pool, "auth0|abc123").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Property owner (default for every new account)
    #[default]
    Owner,

    /// Operator with access to every account
    Admin,
}

impl UserRole {
    /// Converts role to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
        }
    }
}

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    /// Unique email address
    pub email: String,

    pub first_name: String,

    pub last_name: String,

    pub phone: Option<String>,

    /// Identity-provider subject id (immutable)
    pub auth0_id: String,

    pub role: UserRole,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this user may act on other users' records
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub auth0_id: String,
    pub role: UserRole,
}

/// Input for updating an existing user
///
/// Only `Some` fields are written. `auth0_id` is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,

    /// Use `Some(None)` to clear
    pub phone: Option<Option<String>>,

    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl UpdateUser {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the email or subject id is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, first_name, last_name, phone, auth0_id, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, first_name, last_name, phone, auth0_id, role,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(data.email)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.phone)
        .bind(data.auth0_id)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Inserts a user unless one with the same subject id already exists
    ///
    /// Returns `None` when the subject id was already present (including when a
    /// concurrent transaction inserted it first). Conflicts on `email` still
    /// surface as errors.
    pub async fn create_if_absent(
        pool: &PgPool,
        data: CreateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, first_name, last_name, phone, auth0_id, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (auth0_id) DO NOTHING
            RETURNING id, email, first_name, last_name, phone, auth0_id, role,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(data.email)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.phone)
        .bind(data.auth0_id)
        .bind(data.role)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, first_name, last_name, phone, auth0_id, role,
                   is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by identity-provider subject id
    pub async fn find_by_auth0_id(
        pool: &PgPool,
        auth0_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, first_name, last_name, phone, auth0_id, role,
                   is_active, created_at, updated_at
            FROM users
            WHERE auth0_id = $1
            "#,
        )
        .bind(auth0_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Applies a partial update
    ///
    /// `updated_at` is always bumped. Returns `None` if the user doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE users SET updated_at = NOW()");

        if let Some(email) = data.email {
            query.push(", email = ").push_bind(email);
        }
        if let Some(first_name) = data.first_name {
            query.push(", first_name = ").push_bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            query.push(", last_name = ").push_bind(last_name);
        }
        if let Some(phone) = data.phone {
            query.push(", phone = ").push_bind(phone);
        }
        if let Some(role) = data.role {
            query.push(", role = ").push_bind(role);
        }
        if let Some(is_active) = data.is_active {
            query.push(", is_active = ").push_bind(is_active);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(
            " RETURNING id, email, first_name, last_name, phone, auth0_id, role, \
             is_active, created_at, updated_at",
        );

        let user = query.build_query_as::<User>().fetch_optional(pool).await?;

        Ok(user)
    }

    /// Deletes a user by ID
    ///
    /// Returns false if the user didn't exist.
    ///
    /// # Errors
    ///
    /// Fails with a foreign-key violation while the user still owns properties.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, first_name, last_name, phone, auth0_id, role,
                   is_active, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Counts users with a given subject id (0 or 1 given the unique constraint)
    pub async fn count_by_auth0_id(pool: &PgPool, auth0_id: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE auth0_id = $1")
            .bind(auth0_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
