//! Transcript location.
//!
//! Indexes (or reloads) the book, then finds the chunk best matching the
//! transcript and, with `--span`, the exact run of words. Used by the
//! `ral locate` command.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use readalong_core::models::{MatchResult, SpanMatch};

use crate::book;
use crate::config::Config;

/// Options of one `ral locate` invocation.
#[derive(Debug, Clone)]
pub struct LocateRequest<'a> {
    pub book: &'a Path,
    pub transcript: &'a str,
    pub chapters: Option<&'a Path>,
    pub chapter: Option<&'a str>,
    pub threshold: Option<f64>,
    pub span: bool,
    pub json: bool,
}

/// JSON shape of `ral locate --json`.
#[derive(Debug, Clone, Serialize)]
pub struct LocateResponse {
    pub book_hash: String,
    #[serde(rename = "match")]
    pub found: Option<MatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SpanMatch>,
}

/// Core locate function returning structured data.
pub async fn locate(config: &Config, req: &LocateRequest<'_>) -> Result<LocateResponse> {
    let mut config = config.clone();
    if let Some(threshold) = req.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("--threshold must be in [0.0, 1.0]");
        }
        config.locator.threshold = threshold;
    }

    let store = book::open_store(&config).await;
    let mut locator = book::build_locator(&config, store);
    let outcome = book::load_into(&mut locator, req.book, None, req.chapters).await?;

    let found = locator.search(req.transcript, req.chapter);
    let span = if req.span {
        locator.locate_span(req.transcript)
    } else {
        None
    };

    Ok(LocateResponse {
        book_hash: outcome.book_hash,
        found,
        span,
    })
}

pub async fn run_locate(config: &Config, req: &LocateRequest<'_>) -> Result<()> {
    let response = locate(config, req).await?;

    if req.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    match &response.found {
        Some(m) => {
            println!("chunk: {}", m.index);
            println!("score: {:.3}", m.score);
            println!("text: {}", m.text);
        }
        None => println!("No match."),
    }
    if req.span {
        match &response.span {
            Some(s) => {
                println!("span: words {}-{}", s.start_word, s.end_word);
                println!("confidence: {:.3}", s.confidence);
                println!("words: {}", s.matched_text);
            }
            None => println!("No span."),
        }
    }

    Ok(())
}
