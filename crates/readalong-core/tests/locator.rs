use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use readalong_core::chunk::chunk_book;
use readalong_core::index::{book_hash, BookIndex};
use readalong_core::locator::{Locator, LocatorParams};
use readalong_core::models::{Chapter, IndexSource};
use readalong_core::normalize::normalize;
use readalong_core::similarity::{
    Backend, BackendKind, ReferenceBackend, SimilarityBackend, SimilarityBreakdown, SimilarityWeights,
};
use readalong_core::store::memory::InMemoryIndexStore;
use readalong_core::store::{IndexStore, IndexSummary, StoreError};

const CHAPTER_ONE: &str = "The morning fog rolled slowly over the quiet harbor town. \
    Fishermen were already mending their nets beside the old stone pier. \
    The bell rang at noon in the old town square.";

const CHAPTER_TWO: &str = "Soberly, said the man, we must leave before the storm arrives. \
    The children ran laughing through the narrow alleys. \
    The bell rang at noon in the old town square.";

fn book() -> String {
    format!("{}\n\n{}", CHAPTER_ONE, CHAPTER_TWO)
}

fn chapters() -> Vec<Chapter> {
    vec![
        Chapter {
            id: "1".to_string(),
            title: "Chapter One".to_string(),
            text: CHAPTER_ONE.to_string(),
        },
        Chapter {
            id: "2".to_string(),
            title: "Chapter Two".to_string(),
            text: CHAPTER_TWO.to_string(),
        },
    ]
}

fn locator<S: IndexStore>(store: S) -> Locator<S, ReferenceBackend> {
    Locator::new(store, ReferenceBackend::default(), LocatorParams::default())
}

async fn indexed() -> Locator<InMemoryIndexStore, ReferenceBackend> {
    let mut loc = locator(InMemoryIndexStore::new());
    let chapters = chapters();
    loc.create_index(&book(), "Harbor", Some(&chapters)).await;
    loc
}

/// Store that fails every operation.
struct OfflineStore;

#[async_trait]
impl IndexStore for OfflineStore {
    async fn index_exists(&self, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }
    async fn load_index(&self, _: &str) -> Result<Option<BookIndex>, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }
    async fn save_index(&self, _: &BookIndex) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }
    async fn delete_index(&self, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }
    async fn list_indexes(&self) -> Result<Vec<IndexSummary>, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }
}

/// Reference backend that records the (query, candidate) char lengths it
/// is asked to score.
#[derive(Default)]
struct RecordingBackend {
    inner: ReferenceBackend,
    scored: Mutex<Vec<(usize, usize)>>,
}

impl SimilarityBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn weights(&self) -> &SimilarityWeights {
        self.inner.weights()
    }

    fn breakdown(&self, query: &str, candidate: &str) -> SimilarityBreakdown {
        self.inner.breakdown(query, candidate)
    }

    fn score_batch(&self, query: &str, candidates: &[&str]) -> Vec<f64> {
        let query_len = query.chars().count();
        self.scored
            .lock()
            .unwrap()
            .extend(candidates.iter().map(|c| (query_len, c.chars().count())));
        self.inner.score_batch(query, candidates)
    }
}

/// Small deterministic LCG so generated books are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

const VOCAB: [&str; 16] = [
    "the", "harbor", "bell", "rang", "fog", "a", "fishermen", "mended", "nets", "quiet",
    "storm", "children", "alleys", "noon", "square", "old",
];

fn random_words(rng: &mut Lcg, count: usize) -> String {
    (0..count)
        .map(|_| VOCAB[rng.below(VOCAB.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn within_ratio(a: usize, b: usize) -> bool {
    a <= 2 * b && b <= 2 * a
}

#[tokio::test]
async fn test_chunks_and_chapter_ranges() {
    let loc = indexed().await;
    assert_eq!(loc.chunk_count(), 6);
    let ranges = loc.chapters();
    assert_eq!(ranges.len(), 2);
    assert_eq!((ranges[0].start, ranges[0].end), (0, 2));
    assert_eq!((ranges[1].start, ranges[1].end), (3, 5));
    assert_eq!(
        loc.chunk(3).map(|c| c.text.as_str()),
        Some("Soberly, said the man, we must leave before the storm arrives.")
    );
}

#[tokio::test]
async fn test_exact_chunk_matches_itself() {
    let loc = indexed().await;
    for index in [0, 1, 2, 3, 4] {
        let text = loc.chunk(index).unwrap().text.clone();
        let found = loc.search(&text, None).unwrap();
        assert_eq!(found.index, index, "wrong chunk for {:?}", text);
        assert_eq!(found.text, text);
        assert!(found.score >= 0.95, "self match scored {}", found.score);
    }
}

#[tokio::test]
async fn test_duplicate_chunk_ties_to_lowest_index() {
    let loc = indexed().await;
    let found = loc
        .search("the bell rang at noon in the old town square", None)
        .unwrap();
    assert_eq!(found.index, 2);
}

#[tokio::test]
async fn test_chapter_scope() {
    let loc = indexed().await;
    let query = "the bell rang at noon in the old town square";

    assert_eq!(loc.search(query, Some("2")).unwrap().index, 5);
    assert_eq!(loc.search(query, Some("Chapter Two")).unwrap().index, 5);
    assert_eq!(loc.search(query, Some("1")).unwrap().index, 2);
    // Unknown chapters search the whole book.
    assert_eq!(loc.search(query, Some("missing")).unwrap().index, 2);
}

#[tokio::test]
async fn test_chapter_scope_never_leaves_range() {
    let loc = indexed().await;
    let found = loc.search("the children ran laughing through the narrow alleys", Some("1"));
    assert!(found.map_or(true, |m| m.index <= 2));
}

#[tokio::test]
async fn test_noisy_transcript() {
    let loc = indexed().await;
    let found = loc
        .search("the morning fog rolled slowly over the quiet harbour town", None)
        .unwrap();
    assert_eq!(found.index, 0);
    assert!(found.score > 0.25);

    let found = loc
        .search("fisherman were already mending there nets beside the old stone pier", None)
        .unwrap();
    assert_eq!(found.index, 1);
}

#[tokio::test]
async fn test_split_word_transcript() {
    let loc = indexed().await;
    let found = loc
        .search("so really said the man we must leave before the storm arrives", None)
        .unwrap();
    assert_eq!(found.index, 3);
    assert!(found.score > 0.25);
}

#[tokio::test]
async fn test_length_filter_skips_long_chunks() {
    let loc = indexed().await;
    // Every chunk is more than twice as long as the query.
    assert!(loc.search("the bell rang", None).is_none());
}

#[tokio::test]
async fn test_length_ratio_holds_for_random_books() {
    let mut rng = Lcg(0x5eed);
    for _ in 0..30 {
        let sentences: Vec<String> = (0..2 + rng.below(12))
            .map(|_| {
                let n = 2 + rng.below(25);
                format!("{}.", random_words(&mut rng, n))
            })
            .collect();
        let book = sentences.join(" ");

        let mut loc = Locator::new(
            InMemoryIndexStore::new(),
            RecordingBackend::default(),
            LocatorParams {
                threshold: 0.0,
                ..LocatorParams::default()
            },
        );
        loc.create_index(&book, "Random", None).await;

        for _ in 0..10 {
            let n = 1 + rng.below(30);
            let query = random_words(&mut rng, n);
            let query_len = normalize(&query).chars().count();

            if let Some(found) = loc.search(&query, None) {
                let chunk_len = loc.chunk(found.index).unwrap().normalized.chars().count();
                assert!(
                    within_ratio(query_len, chunk_len),
                    "returned chunk of {} chars for query of {}",
                    chunk_len,
                    query_len
                );
            }
        }

        let scored = loc.backend().scored.lock().unwrap();
        for &(q, c) in scored.iter() {
            assert!(within_ratio(q, c), "scored chunk of {} chars for query of {}", c, q);
        }
    }
}

#[tokio::test]
async fn test_unrelated_and_empty_queries() {
    let loc = indexed().await;
    assert!(loc
        .search("unrelated galaxy banana quantum phrase", None)
        .is_none());
    assert!(loc.search("", None).is_none());
    assert!(loc.search("?!...", None).is_none());
}

#[tokio::test]
async fn test_empty_book() {
    let mut loc = locator(InMemoryIndexStore::new());
    assert!(loc.search("anything at all here", None).is_none());

    let outcome = loc.create_index("", "Empty", None).await;
    assert_eq!(outcome.chunk_count, 0);
    assert!(loc.search("anything at all here", None).is_none());
    assert!(loc.locate_span("anything at all here").is_none());
}

#[tokio::test]
async fn test_second_index_is_loaded() {
    let store = Arc::new(InMemoryIndexStore::new());
    let chapters = chapters();

    let mut first = locator(store.clone());
    let built = first.create_index(&book(), "Harbor", Some(&chapters)).await;
    assert_eq!(built.source, IndexSource::Built);

    let mut second = locator(store.clone());
    let loaded = second.create_index(&book(), "Harbor", None).await;
    assert_eq!(loaded.source, IndexSource::Loaded);
    assert_eq!(loaded.book_hash, built.book_hash);
    assert_eq!(loaded.chunk_count, built.chunk_count);
    // Chapter ranges come back from the persisted index.
    assert_eq!(second.chapters(), first.chapters());

    let query = "the children ran laughing through the narrow alleys";
    assert_eq!(first.search(query, None), second.search(query, None));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_reload_with_chapters_keeps_stored_index() {
    let store = Arc::new(InMemoryIndexStore::new());
    let hash = book_hash(&book());

    let mut first = locator(store.clone());
    first.create_index(&book(), "Harbor", None).await;
    let stored = store.load_index(&hash).await.unwrap().unwrap();
    assert!(stored.metadata.chapters.is_empty());

    let chapters = chapters();
    let mut second = locator(store.clone());
    let outcome = second.create_index(&book(), "Harbor", Some(&chapters)).await;
    assert_eq!(outcome.source, IndexSource::Loaded);
    assert_eq!(outcome.chapter_count, 2);
    assert_eq!(second.chapters().len(), 2);
    assert_eq!(
        second
            .search("the bell rang at noon in the old town square", Some("2"))
            .unwrap()
            .index,
        5
    );

    assert_eq!(store.load_index(&hash).await.unwrap().unwrap(), stored);
}

#[tokio::test]
async fn test_changed_text_gets_new_index() {
    let store = Arc::new(InMemoryIndexStore::new());
    let mut loc = locator(store.clone());
    let a = loc.create_index(&book(), "Harbor", None).await;
    let b = loc
        .create_index(&format!("{} One more sentence at the end.", book()), "Harbor", None)
        .await;
    assert_ne!(a.book_hash, b.book_hash);
    assert_eq!(b.source, IndexSource::Built);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_malformed_index_is_rebuilt() {
    let store = Arc::new(InMemoryIndexStore::new());
    let hash = book_hash(&book());
    store.insert_raw(
        &hash,
        IndexSummary {
            book_hash: hash.clone(),
            title: "Harbor".to_string(),
            chunk_count: 6,
            version: 1,
            created_at: 0,
        },
        "{\"book_hash\": 42}".to_string(),
    );

    let mut loc = locator(store.clone());
    let outcome = loc.create_index(&book(), "Harbor", None).await;
    assert_eq!(outcome.source, IndexSource::Built);
    // The rebuilt index replaced the bad payload.
    assert!(store.load_index(&hash).await.unwrap().is_some());
}

#[tokio::test]
async fn test_stale_index_is_rebuilt() {
    let store = Arc::new(InMemoryIndexStore::new());
    let hash = book_hash(&book());
    let other = "Only a single sentence lives in this other book.";
    let stale = BookIndex::build(&hash, "Stale", &chunk_book(other), Vec::new());
    store.save_index(&stale).await.unwrap();

    let mut loc = locator(store.clone());
    let outcome = loc.create_index(&book(), "Harbor", None).await;
    assert_eq!(outcome.source, IndexSource::Built);
    assert_eq!(outcome.chunk_count, 6);
    let stored = store.load_index(&hash).await.unwrap().unwrap();
    assert_eq!(stored.metadata.chunk_count, 6);
}

#[tokio::test]
async fn test_offline_store_still_indexes() {
    let mut loc = locator(OfflineStore);
    let outcome = loc.create_index(&book(), "Harbor", None).await;
    assert_eq!(outcome.source, IndexSource::Built);
    let found = loc
        .search("the children ran laughing through the narrow alleys", None)
        .unwrap();
    assert_eq!(found.index, 4);
}

#[tokio::test]
async fn test_hash_and_chunking_deterministic() {
    assert_eq!(book_hash(&book()), book_hash(&book()));
    assert_eq!(chunk_book(&book()), chunk_book(&book()));
}

#[tokio::test]
async fn test_backends_agree() {
    let text = book();
    let mut reference = locator(InMemoryIndexStore::new());
    reference.create_index(&text, "Harbor", None).await;

    let mut selected = Locator::new(
        InMemoryIndexStore::new(),
        Backend::select(BackendKind::Accelerated, SimilarityWeights::DEFAULT),
        LocatorParams::default(),
    );
    selected.create_index(&text, "Harbor", None).await;

    for query in [
        "so really said the man we must leave before the storm arrives",
        "the morning fog rolled slowly over the quiet harbour town",
        "fisherman were already mending there nets",
        "the bell rang at noon in the old town square",
    ] {
        let a = reference.search(query, None);
        let b = selected.search(query, None);
        assert_eq!(a.as_ref().map(|m| m.index), b.as_ref().map(|m| m.index));
        if let (Some(a), Some(b)) = (a, b) {
            assert!((a.score - b.score).abs() < 1e-9);
        }
    }
}

#[tokio::test]
async fn test_threshold_from_params() {
    let mut strict = Locator::new(
        InMemoryIndexStore::new(),
        ReferenceBackend::default(),
        LocatorParams {
            threshold: 0.99,
            ..LocatorParams::default()
        },
    );
    strict.create_index(&book(), "Harbor", None).await;
    // Even a perfect self match tops out at 0.975.
    assert!(strict
        .search("The children ran laughing through the narrow alleys.", None)
        .is_none());
    assert!(indexed()
        .await
        .search("The children ran laughing through the narrow alleys.", None)
        .is_some());
}

#[tokio::test]
async fn test_locate_span() {
    let loc = indexed().await;
    let span = loc.locate_span("said the man we must leave").unwrap();
    assert_eq!((span.start_word, span.end_word), (32, 37));
    assert_eq!(span.matched_text, "said the man we must leave");
    assert_eq!(span.confidence, 1.0);
}
