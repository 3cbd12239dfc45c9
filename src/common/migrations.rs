// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created if missing. With `reset` set, existing tables are
/// dropped first (local development only).
pub async fn run_migrations(pool: &SqlitePool, reset: bool) -> Result<(), sqlx::Error> {
    if reset {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    }

    create_user_tables(pool).await?;
    create_indexes(pool).await?;

    info!("✅ Database migration completed successfully!");
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DROP TABLE IF EXISTS users")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            picture TEXT,
            admin BOOLEAN NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            last_login TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;
    Ok(())
}
