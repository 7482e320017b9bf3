/// Configuration management for the API server
///
/// Loaded from environment variables (an optional `.env` file is read
/// first) into a typed [`Config`].
///
/// # Environment Variables
///
/// - `API_HOST` (default `0.0.0.0`), `API_PORT` (default `3001`)
/// - `API_PRODUCTION`: enables HSTS (default `false`)
/// - `CORS_ORIGINS`: comma-separated allow-list, `*` for permissive (default `*`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS` / `DATABASE_MIN_CONNECTIONS` (default 10 / 2)
/// - `DATABASE_CONNECT_TIMEOUT_SECS` / `DATABASE_STATEMENT_TIMEOUT_SECS` (default 30 / 30)
/// - `RUN_MIGRATIONS`: apply migrations at startup (default `true`)
/// - `AUTH0_DOMAIN`, `AUTH0_AUDIENCE` (required)
/// - `JWKS_CACHE_TTL_SECS` (600), `JWKS_MIN_REFRESH_INTERVAL_SECS` (12),
///   `JWKS_FETCH_TIMEOUT_SECS` (5), `JWT_LEEWAY_SECS` (60)
/// - `LOG_FORMAT`: `json` or `pretty` (default `pretty`)
///
/// # Example
///
/// ```no_run
/// use ownerpulse_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use ownerpulse_shared::auth::jwt::VerifierConfig;
use ownerpulse_shared::db::pool::DatabaseConfig as PoolConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Production mode (adds HSTS)
    pub production: bool,

    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    pub statement_timeout_seconds: u64,

    /// Apply pending migrations at startup
    pub run_migrations: bool,
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Auth0 tenant domain, e.g. `ownerpulse.us.auth0.com`
    pub domain: String,

    /// Expected `aud` claim
    pub audience: String,

    pub jwks_cache_ttl_seconds: u64,
    pub jwks_min_refresh_interval_seconds: u64,
    pub jwks_fetch_timeout_seconds: u64,

    /// Clock-skew tolerance for `exp` / `nbf`
    pub leeway_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails
    /// to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'json' or 'pretty', got '{}'", other),
        };

        Ok(Self {
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "API_PORT", 3001)?,
                production: parse_bool_or(&lookup, "API_PRODUCTION", false)?,
                cors_origins,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 2)?,
                connect_timeout_seconds: parse_or(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS", 30)?,
                statement_timeout_seconds: parse_or(
                    &lookup,
                    "DATABASE_STATEMENT_TIMEOUT_SECS",
                    30,
                )?,
                run_migrations: parse_bool_or(&lookup, "RUN_MIGRATIONS", true)?,
            },
            auth: AuthConfig {
                domain: required("AUTH0_DOMAIN")?,
                audience: required("AUTH0_AUDIENCE")?,
                jwks_cache_ttl_seconds: parse_or(&lookup, "JWKS_CACHE_TTL_SECS", 600)?,
                jwks_min_refresh_interval_seconds: parse_or(
                    &lookup,
                    "JWKS_MIN_REFRESH_INTERVAL_SECS",
                    12,
                )?,
                jwks_fetch_timeout_seconds: parse_or(&lookup, "JWKS_FETCH_TIMEOUT_SECS", 5)?,
                leeway_seconds: parse_or(&lookup, "JWT_LEEWAY_SECS", 60)?,
            },
            logging: LoggingConfig { format },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for the shared database layer
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            min_connections: self.database.min_connections,
            connect_timeout_seconds: self.database.connect_timeout_seconds,
            statement_timeout_seconds: Some(self.database.statement_timeout_seconds)
                .filter(|secs| *secs > 0),
            ..Default::default()
        }
    }

    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig::for_domain(
            &self.auth.domain,
            &self.auth.audience,
            self.auth.leeway_seconds,
        )
    }

    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.jwks_cache_ttl_seconds)
    }

    pub fn jwks_min_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auth.jwks_min_refresh_interval_seconds)
    }

    pub fn jwks_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.jwks_fetch_timeout_seconds)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        _ => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> anyhow::Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(default),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("no") => Ok(false),
        Some(other) => anyhow::bail!("{} must be a boolean, got '{}'", key, other),
    }
}
