//! SQLite-backed [`IndexStore`] implementation.
//!
//! Each book index is one row of `book_indexes`, keyed by content hash.
//! Summary columns are duplicated out of the JSON payload so listing does
//! not have to decode every index.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use readalong_core::index::BookIndex;
use readalong_core::store::{decode, encode, IndexStore, IndexSummary, StoreError};

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`IndexStore`] trait.
pub struct SqliteIndexStore {
    pool: SqlitePool,
}

impl SqliteIndexStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn backend_error(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl IndexStore for SqliteIndexStore {
    async fn index_exists(&self, book_hash: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM book_indexes WHERE book_hash = ?")
                .bind(book_hash)
                .fetch_one(&self.pool)
                .await
                .map_err(backend_error)?;
        Ok(exists)
    }

    async fn load_index(&self, book_hash: &str) -> Result<Option<BookIndex>, StoreError> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM book_indexes WHERE book_hash = ?")
                .bind(book_hash)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend_error)?;

        payload
            .map(|payload| decode(book_hash, &payload))
            .transpose()
    }

    async fn save_index(&self, index: &BookIndex) -> Result<(), StoreError> {
        let payload = encode(index)?;
        sqlx::query(
            r#"
            INSERT INTO book_indexes (book_hash, title, chunk_count, version, created_at, payload)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(book_hash) DO UPDATE SET
                title = excluded.title,
                chunk_count = excluded.chunk_count,
                version = excluded.version,
                created_at = excluded.created_at,
                payload = excluded.payload
            "#,
        )
        .bind(&index.book_hash)
        .bind(&index.metadata.title)
        .bind(index.metadata.chunk_count as i64)
        .bind(i64::from(index.metadata.version))
        .bind(index.metadata.created_at)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(())
    }

    async fn delete_index(&self, book_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM book_indexes WHERE book_hash = ?")
            .bind(book_hash)
            .execute(&self.pool)
            .await
            .map_err(backend_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT book_hash, title, chunk_count, version, created_at \
             FROM book_indexes ORDER BY book_hash ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(rows
            .iter()
            .map(|row| IndexSummary {
                book_hash: row.get("book_hash"),
                title: row.get("title"),
                chunk_count: row.get::<i64, _>("chunk_count").max(0) as usize,
                version: row.get::<i64, _>("version").clamp(0, i64::from(u32::MAX)) as u32,
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readalong_core::chunk::chunk_book;
    use readalong_core::index::book_hash;
    use tempfile::TempDir;

    use crate::config::StoreBackend;

    async fn open_store(tmp: &TempDir) -> SqliteIndexStore {
        let mut config = Config::minimal();
        config.store.path = tmp.path().join("data").join("readalong.sqlite");
        config.store.backend = StoreBackend::Sqlite;
        SqliteIndexStore::open(&config).await.unwrap()
    }

    fn sample(text: &str) -> BookIndex {
        BookIndex::build(&book_hash(text), "Sample", &chunk_book(text), Vec::new())
    }

    #[tokio::test]
    async fn test_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let index = sample("The only sentence in this small book.");

        assert!(!store.index_exists(&index.book_hash).await.unwrap());
        store.save_index(&index).await.unwrap();
        assert!(store.index_exists(&index.book_hash).await.unwrap());
        assert_eq!(store.load_index(&index.book_hash).await.unwrap(), Some(index.clone()));

        let listed = store.list_indexes().await.unwrap();
        assert_eq!(listed, vec![IndexSummary::of(&index)]);

        assert!(store.delete_index(&index.book_hash).await.unwrap());
        assert!(!store.delete_index(&index.book_hash).await.unwrap());
        assert!(store.load_index(&index.book_hash).await.unwrap().is_none());
        store.close().await;
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let mut index = sample("The only sentence in this small book.");
        store.save_index(&index).await.unwrap();
        index.metadata.title = "Renamed".to_string();
        store.save_index(&index).await.unwrap();

        let listed = store.list_indexes().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Renamed");
        store.close().await;
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        sqlx::query(
            "INSERT INTO book_indexes (book_hash, chunk_count, version, created_at, payload) \
             VALUES ('abc', 0, 1, 0, 'not json')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.load_index("abc").await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
        store.close().await;
    }
}
