use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the schema on an open pool. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One row per book, keyed by content hash; payload is the JSON index
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS book_indexes (
            book_hash TEXT PRIMARY KEY,
            title TEXT NOT NULL DEFAULT '',
            chunk_count INTEGER NOT NULL,
            version INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            payload TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_book_indexes_created_at ON book_indexes(created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
