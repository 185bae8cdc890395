//! TOML configuration.
//!
//! Every section is optional; a missing config file yields the defaults
//! below. See [`load_config`] for validation rules.
//!
//! ```toml
//! [store]
//! path = ".memory/store.jsonl"
//!
//! [embedding]
//! backend = "tfidf"          # tfidf | openai | ollama
//!
//! [chunking]
//! chunk_size_words = 512
//! overlap_words = 64
//!
//! [rehydration]
//! snapshot_path = ".memory/ACTIVE_MEMORY.md"
//! telemetry_dir = "logs/telemetry"
//! index_path = ".memory/ORG_REPO_INDEX.json"
//! freshness_hours = 2.0
//! ```

use anyhow::{bail, Context, Result};
use memory_harness_core::models::EmbeddingBackend;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub rehydration: RehydrationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".memory/store.jsonl")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default, deserialize_with = "deserialize_backend")]
    pub backend: EmbeddingBackend,
    /// Model name; each backend has its own default.
    #[serde(default)]
    pub model: Option<String>,
    /// Endpoint URL (OpenAI) or base URL (Ollama).
    #[serde(default)]
    pub url: Option<String>,
    /// Environment variable holding the API credential.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout; each backend has its own default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Tfidf,
            model: None,
            url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: None,
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn deserialize_backend<'de, D>(deserializer: D) -> std::result::Result<EmbeddingBackend, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size_words: usize,
    #[serde(default = "default_overlap")]
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size_words: default_chunk_size(),
            overlap_words: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    512
}
fn default_overlap() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct RehydrationConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default = "default_telemetry_dir")]
    pub telemetry_dir: PathBuf,
    /// Glob matched against file names inside `telemetry_dir`.
    #[serde(default = "default_telemetry_pattern")]
    pub telemetry_pattern: String,
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    /// Snapshot age above which a staleness warning is recorded.
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: f64,
    #[serde(default = "default_max_recent_runs")]
    pub max_recent_runs: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_true")]
    pub include_active_memory: bool,
    #[serde(default = "default_true")]
    pub include_telemetry: bool,
    #[serde(default = "default_true")]
    pub include_index: bool,
}

impl Default for RehydrationConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            telemetry_dir: default_telemetry_dir(),
            telemetry_pattern: default_telemetry_pattern(),
            index_path: default_index_path(),
            freshness_hours: default_freshness_hours(),
            max_recent_runs: default_max_recent_runs(),
            top_k: default_top_k(),
            include_active_memory: true,
            include_telemetry: true,
            include_index: true,
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(".memory/ACTIVE_MEMORY.md")
}
fn default_telemetry_dir() -> PathBuf {
    PathBuf::from("logs/telemetry")
}
fn default_telemetry_pattern() -> String {
    "run-*.json".to_string()
}
fn default_index_path() -> PathBuf {
    PathBuf::from(".memory/ORG_REPO_INDEX.json")
}
fn default_freshness_hours() -> f64 {
    2.0
}
fn default_max_recent_runs() -> usize {
    5
}
fn default_top_k() -> usize {
    10
}
fn default_true() -> bool {
    true
}

/// Parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields [`Config::default`].
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size_words == 0 {
        bail!("chunking.chunk_size_words must be > 0");
    }
    if config.chunking.overlap_words >= config.chunking.chunk_size_words {
        bail!("chunking.overlap_words must be < chunking.chunk_size_words");
    }

    let hours = config.rehydration.freshness_hours;
    if !hours.is_finite() || hours < 0.0 {
        bail!("rehydration.freshness_hours must be a non-negative number");
    }

    if let Some(t) = config.embedding.timeout_secs {
        if !(1..=60).contains(&t) {
            bail!("embedding.timeout_secs must be in 1..=60");
        }
    }

    if config.embedding.backend == EmbeddingBackend::None {
        bail!("embedding.backend must be tfidf, openai, or ollama");
    }

    if let Err(e) = globset::Glob::new(&config.rehydration.telemetry_pattern) {
        bail!("rehydration.telemetry_pattern is not a valid glob: {}", e);
    }

    Ok(())
}
