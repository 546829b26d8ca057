//! Shared plumbing for commands that work on a book file: reading the
//! book and its chapters, opening the configured index store, and
//! building a [`Locator`].

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use readalong_core::locator::Locator;
use readalong_core::models::{Chapter, IndexOutcome};
use readalong_core::similarity::{Backend, SimilarityBackend};
use readalong_core::store::memory::InMemoryIndexStore;
use readalong_core::store::IndexStore;

use crate::config::{Config, StoreBackend};
use crate::sqlite_store::SqliteIndexStore;

pub type SharedStore = Arc<dyn IndexStore>;

/// Open the configured store. A SQLite store that cannot be opened is
/// replaced by a volatile in-memory one.
pub async fn open_store(config: &Config) -> SharedStore {
    match config.store.backend {
        StoreBackend::Memory => Arc::new(InMemoryIndexStore::new()),
        StoreBackend::Sqlite => match SqliteIndexStore::open(config).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(
                    path = %config.store.path.display(),
                    error = %e,
                    "index database unavailable; indexes will not be persisted"
                );
                Arc::new(InMemoryIndexStore::new())
            }
        },
    }
}

/// Build a locator over `store` using the configured backend and params.
pub fn build_locator(config: &Config, store: SharedStore) -> Locator<SharedStore> {
    let backend = Backend::select(config.locator.backend, config.weights);
    debug!(backend = backend.name(), "similarity backend selected");
    Locator::new(store, backend, config.locator.params())
}

pub fn read_book(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read book: {}", path.display()))
}

/// Read a JSON array of `{ "id", "title", "text" }` chapter objects.
pub fn read_chapters(path: &Path) -> Result<Vec<Chapter>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chapters file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse chapters file: {}", path.display()))
}

/// Title for a book: the explicit one, else the file stem.
pub fn book_title(path: &Path, title: Option<&str>) -> String {
    match title {
        Some(t) => t.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

/// Read the book (and chapters, if given) and make it the locator's
/// active book.
pub async fn load_into(
    locator: &mut Locator<SharedStore>,
    book: &Path,
    title: Option<&str>,
    chapters: Option<&Path>,
) -> Result<IndexOutcome> {
    let text = read_book(book)?;
    let chapters = chapters.map(read_chapters).transpose()?;
    let title = book_title(book, title);
    Ok(locator
        .create_index(&text, &title, chapters.as_deref())
        .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_book_title() {
        let path = PathBuf::from("/books/moby-dick.txt");
        assert_eq!(book_title(&path, None), "moby-dick");
        assert_eq!(book_title(&path, Some("Moby Dick")), "Moby Dick");
    }

    #[test]
    fn test_read_chapters() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("chapters.json");
        std::fs::write(
            &path,
            r#"[{"id": "1", "title": "Loomings", "text": "Call me Ishmael."}, {"id": "2", "text": "x"}]"#,
        )
        .unwrap();
        let chapters = read_chapters(&path).unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Loomings");
        assert_eq!(chapters[1].title, "");
    }

    #[test]
    fn test_read_chapters_rejects_bad_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("chapters.json");
        std::fs::write(&path, "{").unwrap();
        assert!(read_chapters(&path).is_err());
    }

    #[tokio::test]
    async fn test_unopenable_database_falls_back_to_memory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut config = Config::minimal();
        config.store.path = blocker.join("db.sqlite");
        let store = open_store(&config).await;
        assert!(store.list_indexes().await.unwrap().is_empty());
    }
}
