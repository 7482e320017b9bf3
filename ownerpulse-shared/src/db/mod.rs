/// Database layer for OwnerPulse
///
/// - `pool`: PostgreSQL connection pool with bounds, timeouts and health checks
/// - `migrations`: Runner for the SQL migrations in the workspace `migrations/` directory
///
/// Models live in the `models` module at crate root level.
///
/// # Example
///
/// ```no_run
/// use ownerpulse_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     ownerpulse_shared::db::migrations::run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;

/// Postgres SQLSTATE for `unique_violation`
pub const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for `foreign_key_violation`
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Postgres SQLSTATE for `check_violation`
pub const CHECK_VIOLATION: &str = "23514";

/// Postgres SQLSTATE for `numeric_value_out_of_range`
pub const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Returns the SQLSTATE code of a database error, if any
pub fn error_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_for_non_database_error() {
        assert_eq!(error_code(&sqlx::Error::RowNotFound), None);
        assert_eq!(error_code(&sqlx::Error::PoolTimedOut), None);
    }
}
