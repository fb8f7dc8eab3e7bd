use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates the entries table and its indexes. Safe to run repeatedly.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // The UNIQUE fingerprint column is the cross-process serialization
    // point for duplicate detection.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            raw_format TEXT NOT NULL,
            title TEXT,
            extracted_text TEXT NOT NULL,
            normalized_text TEXT NOT NULL,
            fingerprint TEXT NOT NULL UNIQUE,
            category TEXT NOT NULL DEFAULT 'unclassified',
            collected_at INTEGER NOT NULL, -- microseconds since epoch
            metadata_json TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_category ON entries(category)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_entries_collected_at ON entries(collected_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
