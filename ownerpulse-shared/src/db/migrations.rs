/// Database migration runner
///
/// Migrations are plain SQL files in the workspace-level `migrations/` directory,
/// named `{timestamp}_{name}.sql`, and are embedded at compile time.
///
/// # Example
///
/// ```no_run
/// use ownerpulse_shared::db::pool::{create_pool, DatabaseConfig};
/// use ownerpulse_shared::db::migrations::run_migrations;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::Migrator, postgres::PgPool};
use tracing::{info, warn};

/// Embedded migrations (path is relative to this crate's Cargo.toml)
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Runs all pending database migrations
///
/// Each migration runs in its own transaction. A failing migration is rolled
/// back and the error is returned; earlier migrations stay applied.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(
        available = MIGRATOR.iter().count(),
        "Starting database migrations"
    );

    match MIGRATOR.run(pool).await {
        Ok(()) => {
            info!("All database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded_in_order() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        assert_eq!(versions.len(), 4);

        let mut sorted = versions.clone();
        sorted.sort();
        assert_eq!(versions, sorted);
    }

    #[test]
    fn test_migration_descriptions() {
        let descriptions: Vec<String> = MIGRATOR
            .iter()
            .map(|m| m.description.to_string())
            .collect();

        assert!(descriptions.iter().any(|d| d == "create users"));
        assert!(descriptions.iter().any(|d| d == "create work orders"));
    }
}
