//! Local SQLite store for customers and contact records
//!
//! Tables are created at startup with `CREATE TABLE IF NOT EXISTS`, so
//! opening an existing database is idempotent.

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

pub mod contact_records;
pub mod customers;

pub use contact_records::{ContactRecord, NewContactRecord};
pub use customers::{Customer, CustomerUpsert};

/// Open (creating if needed) the database file and ensure the schema exists
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_tables(&pool).await.context("Failed to create tables")?;
    Ok(pool)
}

/// Create tables and indexes if missing
pub async fn init_tables(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            legacy_id INTEGER NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            phone_1 TEXT,
            phone_2 TEXT,
            email_1 TEXT,
            email_2 TEXT,
            social_media_links TEXT,
            is_realtor INTEGER NOT NULL DEFAULT 0,
            latest_inspection TEXT,
            last_contact_at TIMESTAMP,
            last_contact_type TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            CHECK (legacy_id > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    for index in [
        "CREATE INDEX IF NOT EXISTS idx_customers_phone_1 ON customers(phone_1)",
        "CREATE INDEX IF NOT EXISTS idx_customers_email_1 ON customers(email_1)",
        "CREATE INDEX IF NOT EXISTS idx_customers_is_realtor ON customers(is_realtor)",
    ] {
        sqlx::query(index).execute(pool).await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contact_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
            contact_type TEXT NOT NULL,
            call_outcome TEXT,
            call_direction TEXT,
            occurred_at TIMESTAMP NOT NULL,
            notes TEXT,
            meta TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for index in [
        "CREATE INDEX IF NOT EXISTS idx_contact_records_customer ON contact_records(customer_id, occurred_at)",
        "CREATE INDEX IF NOT EXISTS idx_contact_records_type ON contact_records(contact_type, occurred_at)",
    ] {
        sqlx::query(index).execute(pool).await?;
    }

    Ok(())
}

/// Single-connection in-memory database with the schema applied
///
/// The pool keeps its one connection alive so the database is not dropped
/// between queries.
pub async fn memory_pool() -> sqlx::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_tables_idempotent() {
        let pool = memory_pool().await.unwrap();
        init_tables(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["contact_records", "customers"]);
    }

    #[tokio::test]
    async fn test_file_database_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("intake.db");

        let pool = init_database_pool(&path).await.unwrap();
        assert!(path.exists());
        pool.close().await;

        // Reopen existing
        let pool = init_database_pool(&path).await.unwrap();
        pool.close().await;
    }
}
