use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use readalong_core::locator::{LocatorParams, DEFAULT_THRESHOLD};
use readalong_core::similarity::{BackendKind, SimilarityWeights};
use readalong_core::span::{DEFAULT_STEP_WORDS, DEFAULT_WINDOW_WORDS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
    /// Overrides of the similarity combination weights. Unset weights keep
    /// their defaults; the final set must still sum to 1.
    #[serde(default)]
    pub weights: SimilarityWeights,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub backend: StoreBackend,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            backend: StoreBackend::default(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/readalong.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocatorConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_span_window_words")]
    pub span_window_words: usize,
    #[serde(default = "default_span_step_words")]
    pub span_step_words: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            backend: BackendKind::default(),
            span_window_words: default_span_window_words(),
            span_step_words: default_span_step_words(),
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_span_window_words() -> usize {
    DEFAULT_WINDOW_WORDS
}
fn default_span_step_words() -> usize {
    DEFAULT_STEP_WORDS
}

impl LocatorConfig {
    pub fn params(&self) -> LocatorParams {
        LocatorParams {
            threshold: self.threshold,
            span_window_words: self.span_window_words,
            span_step_words: self.span_step_words,
        }
    }
}

impl Config {
    /// Defaults for every section, used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            store: StoreConfig::default(),
            locator: LocatorConfig::default(),
            weights: SimilarityWeights::DEFAULT,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.locator.threshold) {
            anyhow::bail!("locator.threshold must be in [0.0, 1.0]");
        }
        if self.locator.span_window_words == 0 {
            anyhow::bail!("locator.span_window_words must be > 0");
        }
        if self.locator.span_step_words == 0 {
            anyhow::bail!("locator.span_step_words must be > 0");
        }
        if self.locator.span_step_words > self.locator.span_window_words {
            anyhow::bail!("locator.span_step_words must not exceed locator.span_window_words");
        }
        self.weights.validate().context("invalid [weights]")?;
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        info!(path = %path.display(), "no config file; using defaults");
        Ok(Config::minimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_text)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.locator.threshold, 0.25);
        assert_eq!(config.locator.backend, BackendKind::Accelerated);
        assert_eq!(config.weights, SimilarityWeights::DEFAULT);
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            r#"
[store]
path = "/tmp/books.sqlite"
backend = "memory"

[locator]
threshold = 0.4
backend = "reference"
span_window_words = 50
span_step_words = 10

[weights]
word_level = 0.55
bigram = 0.10
"#,
        )
        .unwrap();
        assert_eq!(config.store.path, PathBuf::from("/tmp/books.sqlite"));
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.locator.backend, BackendKind::Reference);
        let params = config.locator.params();
        assert_eq!(params.threshold, 0.4);
        assert_eq!(params.span_window_words, 50);
        assert_eq!(config.weights.trigram, 0.15);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse("[locator]\nthreshold = 1.5\n").is_err());
        assert!(parse("[locator]\nspan_step_words = 0\n").is_err());
        assert!(parse("[weights]\nword_level = 0.9\n").is_err());
        assert!(parse("[store]\nbackend = \"postgres\"\n").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = load_or_minimal(Path::new("/nonexistent/readalong.toml")).unwrap();
        assert_eq!(config.locator.threshold, DEFAULT_THRESHOLD);
    }
}
