//! Index management commands: build or reload a book's index, list and
//! delete persisted indexes, and print chapter ranges.

use anyhow::{bail, Result};
use std::path::Path;

use readalong_core::models::IndexSource;
use readalong_core::store::IndexStore;

use crate::book;
use crate::config::Config;

pub async fn run_index(
    config: &Config,
    path: &Path,
    title: Option<&str>,
    chapters: Option<&Path>,
) -> Result<()> {
    let store = book::open_store(config).await;
    let mut locator = book::build_locator(config, store);
    let outcome = book::load_into(&mut locator, path, title, chapters).await?;

    println!("book: {}", outcome.book_hash);
    println!("chunks: {}", outcome.chunk_count);
    println!("chapters: {}", outcome.chapter_count);
    println!(
        "source: {}",
        match outcome.source {
            IndexSource::Built => "built",
            IndexSource::Loaded => "loaded",
        }
    );
    Ok(())
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

pub async fn run_list(config: &Config) -> Result<()> {
    let store = book::open_store(config).await;
    let summaries = store.list_indexes().await?;

    if summaries.is_empty() {
        println!("No indexes.");
        return Ok(());
    }

    println!("{:<64}  {:>7}  {:<20}  TITLE", "BOOK", "CHUNKS", "CREATED");
    for s in summaries {
        println!(
            "{:<64}  {:>7}  {:<20}  {}",
            s.book_hash,
            s.chunk_count,
            format_ts(s.created_at),
            s.title
        );
    }
    Ok(())
}

pub async fn run_forget(config: &Config, book_hash: &str) -> Result<()> {
    let store = book::open_store(config).await;
    if !store.delete_index(book_hash).await? {
        bail!("index not found: {}", book_hash);
    }
    println!("deleted: {}", book_hash);
    Ok(())
}

pub async fn run_chapters(config: &Config, path: &Path, chapters: &Path) -> Result<()> {
    let store = book::open_store(config).await;
    let mut locator = book::build_locator(config, store);
    book::load_into(&mut locator, path, None, Some(chapters)).await?;

    if locator.chapters().is_empty() {
        println!("No chapters.");
        return Ok(());
    }
    for range in locator.chapters() {
        println!("{}\t{}-{}\t{}", range.id, range.start, range.end, range.title);
    }
    Ok(())
}
