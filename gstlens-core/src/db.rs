use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Current schema version, tracked with `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 2;

/// Opens (creating if missing) the local invoice database and applies any
/// pending schema migrations.
///
/// WAL journaling keeps readers unblocked while the sync engine writes.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a migration fails.
pub async fn create_pool(path: impl AsRef<Path>) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path.as_ref())
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;

    Ok(pool)
}

/// Opens an in-memory database for tests.
///
/// A single connection is required: each in-memory SQLite connection is its
/// own database, so a larger pool would scatter the schema. Idle and
/// lifetime recycling are disabled for the same reason: recycling the one
/// connection would drop the whole database mid-test.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;

    Ok(pool)
}

/// Applies schema migrations up to [`SCHEMA_VERSION`].
///
/// Version steps only ever add tables or indexes; index additions never
/// require a data migration, so upgrading an existing database is a
/// backfill-free operation.
async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    info!("Migrating invoice database schema v{} -> v{}", version, SCHEMA_VERSION);

    if version < 1 {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS invoices (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL CHECK(status IN ('draft', 'auto_saved', 'confirmed')),
                fp TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                synced_to_cloud INTEGER NOT NULL DEFAULT 0,
                deleted INTEGER NOT NULL DEFAULT 0,
                cloud_id TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_invoices_fp ON invoices(fp)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_invoices_status ON invoices(status)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_invoices_created_at ON invoices(created_at)")
            .execute(pool)
            .await?;
    }

    if version < 2 {
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_invoices_synced_to_cloud ON invoices(synced_to_cloud)",
        )
        .execute(pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_invoices_updated_at ON invoices(updated_at)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_invoices_deleted ON invoices(deleted)")
            .execute(pool)
            .await?;
    }

    sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_pool_schema_is_current_and_migrate_is_idempotent() {
        let pool = create_memory_pool().await.expect("memory pool");

        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        // Re-running against a current database is a no-op.
        migrate(&pool).await.unwrap();

        sqlx::query("INSERT INTO local_settings (key, value) VALUES ('k', 'v')")
            .execute(&pool)
            .await
            .unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM local_settings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
