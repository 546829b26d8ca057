//! # readalong core
//!
//! Shared, WASM-safe logic for readalong: text normalization, the n-gram
//! book index, fuzzy similarity scoring, chunking and chapter scoping,
//! the index store abstraction, and the snippet locator.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. The optional `accelerated` feature adds a
//! rayon-parallel similarity backend for native targets.
//!
//! ```rust
//! use readalong_core::locator::{Locator, LocatorParams};
//! use readalong_core::similarity::ReferenceBackend;
//! use readalong_core::store::memory::InMemoryIndexStore;
//!
//! # tokio::runtime::Builder::new_current_thread()
//! #     .build()
//! #     .unwrap()
//! #     .block_on(async {
//! let mut locator = Locator::new(
//!     InMemoryIndexStore::new(),
//!     ReferenceBackend::default(),
//!     LocatorParams::default(),
//! );
//! locator
//!     .create_index("It was a dark and stormy night. The rain fell in torrents.", "Demo", None)
//!     .await;
//! let found = locator.search("the rain fell in torrance", None).unwrap();
//! assert_eq!(found.index, 1);
//! # });
//! ```

pub mod chunk;
pub mod index;
pub mod locator;
pub mod models;
pub mod ngram;
pub mod normalize;
pub mod similarity;
pub mod span;
pub mod store;
