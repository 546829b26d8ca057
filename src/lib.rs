//! # readalong
//!
//! Locate noisy speech-transcript snippets in a book.
//!
//! A book is split into sentence and paragraph chunks, indexed by word
//! n-grams, and persisted by content hash. A transcript snippet is
//! matched against a shortlist of chunks with a blend of fuzzy metrics
//! (word alignment tolerant of split and merged words, n-gram overlap,
//! edit distance), optionally within one chapter.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Book text  │──▶│ Chunk+Index  │──▶│ Index store  │
//! │ +chapters  │   │ (n-grams)    │   │ SQLite / mem │
//! └────────────┘   └──────┬───────┘   └──────────────┘
//!                         │
//!  transcript ──▶ shortlist ──▶ similarity ──▶ best chunk / word span
//! ```
//!
//! The matching engine lives in [`readalong_core`]; this crate adds the
//! configuration, SQLite persistence, and the `ral` CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! ral init                                   # create database
//! ral index book.txt --chapters toc.json     # build or reload the index
//! ral locate book.txt "so really said the man" --span
//! ral list                                   # persisted indexes
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite index store |
//! | [`book`] | Book/chapter loading and locator setup |
//! | [`index_cmd`] | Index management commands |
//! | [`locate`] | Transcript location |
//! | [`logging`] | tracing subscriber setup |

pub mod book;
pub mod config;
pub mod db;
pub mod index_cmd;
pub mod locate;
pub mod logging;
pub mod migrate;
pub mod sqlite_store;
