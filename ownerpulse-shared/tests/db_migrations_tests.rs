/// Integration tests for the schema created by the migrations
///
/// Each `#[sqlx::test]` gets a fresh database with all migrations applied.
/// Requires DATABASE_URL pointing at a server where the test user may create
/// databases.

use ownerpulse_shared::db::{self, migrations::MIGRATOR};
use sqlx::PgPool;

#[sqlx::test(migrations = false)]
async fn test_migrations_are_idempotent(pool: PgPool) {
    MIGRATOR.run(&pool).await.expect("First migration run failed");
    MIGRATOR.run(&pool).await.expect("Second migration run failed");

    let (applied,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(applied, MIGRATOR.iter().count() as i64);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_tables_exist(pool: PgPool) {
    for table in ["users", "properties", "bookings", "work_orders"] {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {} missing", table);
    }
}

#[sqlx::test(migrations = "../migrations")]
async fn test_auth0_id_is_unique(pool: PgPool) {
    sqlx::query(
        "INSERT INTO users (email, first_name, last_name, auth0_id) VALUES ($1, 'A', 'B', 'auth0|dup')",
    )
    .bind("one@example.com")
    .execute(&pool)
    .await
    .unwrap();

    let err = sqlx::query(
        "INSERT INTO users (email, first_name, last_name, auth0_id) VALUES ($1, 'A', 'B', 'auth0|dup')",
    )
    .bind("two@example.com")
    .execute(&pool)
    .await
    .unwrap_err();

    assert_eq!(db::error_code(&err).as_deref(), Some(db::UNIQUE_VIOLATION));
}

#[sqlx::test(migrations = "../migrations")]
async fn test_blank_auth0_id_rejected(pool: PgPool) {
    let err = sqlx::query(
        "INSERT INTO users (email, first_name, last_name, auth0_id) VALUES ('x@example.com', 'A', 'B', '  ')",
    )
    .execute(&pool)
    .await
    .unwrap_err();

    assert_eq!(db::error_code(&err).as_deref(), Some(db::CHECK_VIOLATION));
}

#[sqlx::test(migrations = "../migrations")]
async fn test_property_requires_existing_owner(pool: PgPool) {
    let err = sqlx::query(
        r#"
        INSERT INTO properties (name, address, city, state, zip_code, bedrooms, bathrooms, owner_id)
        VALUES ('Cabin', '1 Lake Rd', 'Tahoe', 'CA', '96150', 2, 1, gen_random_uuid())
        "#,
    )
    .execute(&pool)
    .await
    .unwrap_err();

    assert_eq!(db::error_code(&err).as_deref(), Some(db::FOREIGN_KEY_VIOLATION));
}
