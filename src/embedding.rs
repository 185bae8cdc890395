//! Dense embedding backends.
//!
//! [`DenseBackend`] is the concrete [`DenseEmbedder`] selected from
//! `[embedding]` config:
//!
//! | Config value | Backend | Endpoint |
//! |--------------|---------|----------|
//! | `"tfidf"` | sparse only | none |
//! | `"openai"` | [`OpenAiEmbedder`] | `POST https://api.openai.com/v1/embeddings` |
//! | `"ollama"` | [`OllamaEmbedder`] | `POST {base}/api/embeddings` |
//!
//! Each call is a single blocking request with a bounded timeout and no
//! retry. Any failure becomes an [`EmbeddingUnavailable`] value, which the
//! document store logs before falling back to the sparse vector alone.

use std::time::Duration;

use anyhow::Result;
use memory_harness_core::context::truncate_chars;
use memory_harness_core::embedding::{DenseEmbedder, EmbeddingUnavailable, SparseOnly};
use memory_harness_core::models::EmbeddingBackend;

use crate::config::EmbeddingConfig;

const OPENAI_URL: &str = "https://api.openai.com/v1/embeddings";
const OPENAI_MODEL: &str = "text-embedding-3-small";
const OPENAI_TIMEOUT_SECS: u64 = 15;
/// Characters of input sent to OpenAI.
const OPENAI_MAX_CHARS: usize = 8000;

const OLLAMA_BASE_URL: &str = "http://localhost:11434";
const OLLAMA_MODEL: &str = "nomic-embed-text";
const OLLAMA_TIMEOUT_SECS: u64 = 10;
/// Characters of input sent to Ollama.
const OLLAMA_MAX_CHARS: usize = 4096;

/// The configured dense embedding backend.
#[derive(Debug)]
pub enum DenseBackend {
    Tfidf(SparseOnly),
    OpenAi(OpenAiEmbedder),
    Ollama(OllamaEmbedder),
}

impl DenseEmbedder for DenseBackend {
    fn backend(&self) -> EmbeddingBackend {
        match self {
            DenseBackend::Tfidf(e) => e.backend(),
            DenseBackend::OpenAi(e) => e.backend(),
            DenseBackend::Ollama(e) => e.backend(),
        }
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingUnavailable> {
        match self {
            DenseBackend::Tfidf(e) => e.embed(text),
            DenseBackend::OpenAi(e) => e.embed(text),
            DenseBackend::Ollama(e) => e.embed(text),
        }
    }
}

/// Build the backend named in `config`.
///
/// A missing API key is not an error here: it surfaces per call as
/// [`EmbeddingUnavailable::MissingCredential`].
pub fn create_backend(config: &EmbeddingConfig) -> Result<DenseBackend> {
    match config.backend {
        EmbeddingBackend::Tfidf | EmbeddingBackend::None => Ok(DenseBackend::Tfidf(SparseOnly)),
        EmbeddingBackend::OpenAi => Ok(DenseBackend::OpenAi(OpenAiEmbedder::new(config)?)),
        EmbeddingBackend::Ollama => Ok(DenseBackend::Ollama(OllamaEmbedder::new(config)?)),
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

// ============ OpenAI ============

/// Remote embeddings through the OpenAI API.
#[derive(Debug)]
pub struct OpenAiEmbedder {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    api_key_env: String,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs.unwrap_or(OPENAI_TIMEOUT_SECS))?,
            url: config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OPENAI_MODEL.to_string()),
            api_key_env: config.api_key_env.clone(),
        })
    }
}

impl DenseEmbedder for OpenAiEmbedder {
    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::OpenAi
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingUnavailable> {
        let api_key = std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EmbeddingUnavailable::MissingCredential(self.api_key_env.clone()))?;

        let body = serde_json::json!({
            "input": truncate_chars(text, OPENAI_MAX_CHARS),
            "model": self.model,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| EmbeddingUnavailable::Transport(e.to_string()))?;

        let json = read_json(response)?;
        parse_openai_response(&json)
    }
}

/// Extract `data[0].embedding` from an OpenAI response.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>, EmbeddingUnavailable> {
    let embedding = json
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|item| item.get("embedding"))
        .ok_or_else(|| {
            EmbeddingUnavailable::MalformedResponse("missing data[0].embedding".to_string())
        })?;
    float_array(embedding)
}

// ============ Ollama ============

/// Remote embeddings through a local Ollama server.
#[derive(Debug)]
pub struct OllamaEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base = config.url.as_deref().unwrap_or(OLLAMA_BASE_URL);
        Ok(Self {
            client: http_client(config.timeout_secs.unwrap_or(OLLAMA_TIMEOUT_SECS))?,
            endpoint: format!("{}/api/embeddings", base.trim_end_matches('/')),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OLLAMA_MODEL.to_string()),
        })
    }
}

impl DenseEmbedder for OllamaEmbedder {
    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Ollama
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingUnavailable> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": truncate_chars(text, OLLAMA_MAX_CHARS),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| EmbeddingUnavailable::Transport(e.to_string()))?;

        let json = read_json(response)?;
        parse_ollama_response(&json)
    }
}

/// Extract the top-level `embedding` array from an Ollama response.
fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<f32>, EmbeddingUnavailable> {
    let embedding = json
        .get("embedding")
        .ok_or_else(|| EmbeddingUnavailable::MalformedResponse("missing embedding".to_string()))?;
    float_array(embedding)
}

// ============ Shared ============

fn read_json(
    response: reqwest::blocking::Response,
) -> Result<serde_json::Value, EmbeddingUnavailable> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(EmbeddingUnavailable::Status {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .map_err(|e| EmbeddingUnavailable::MalformedResponse(e.to_string()))
}

fn float_array(value: &serde_json::Value) -> Result<Vec<f32>, EmbeddingUnavailable> {
    let items = value.as_array().ok_or_else(|| {
        EmbeddingUnavailable::MalformedResponse("embedding is not an array".to_string())
    })?;
    if items.is_empty() {
        return Err(EmbeddingUnavailable::MalformedResponse(
            "embedding is empty".to_string(),
        ));
    }
    items
        .iter()
        .map(|v| {
            let f = v.as_f64().ok_or_else(|| {
                EmbeddingUnavailable::MalformedResponse("non-numeric embedding value".to_string())
            })? as f32;
            if !f.is_finite() {
                return Err(EmbeddingUnavailable::MalformedResponse(format!(
                    "embedding value {} is out of f32 range",
                    v
                )));
            }
            Ok(f)
        })
        .collect()
}
