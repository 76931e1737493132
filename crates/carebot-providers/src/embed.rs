//! HTTP embedding providers and the config-driven [`AnyEmbedder`].

use std::time::Duration;

use carebot_core::provider::{Embedder, ProviderError};
use serde_json::json;

use crate::{
  config::{EmbeddingConfig, EmbeddingKind, resolve_api_key},
  hash::HashEmbedder,
  http::{client, finish, floats, join_url, send_json},
};

// ─── OpenAI ──────────────────────────────────────────────────────────────────

/// Embeddings from an OpenAI-compatible `POST /v1/embeddings` endpoint.
pub struct OpenAiEmbedder {
  client:   reqwest::Client,
  base_url: String,
  api_key:  String,
  model:    String,
  dims:     usize,
  timeout:  Duration,
}

impl OpenAiEmbedder {
  pub fn new(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    Ok(Self {
      client: client(timeout)?,
      base_url: config.url.clone().unwrap_or_else(|| "https://api.openai.com".into()),
      api_key: resolve_api_key(
        config.api_key.as_deref(),
        config.api_key_env.as_deref(),
        "OPENAI_API_KEY",
      )?,
      model: config.model()?,
      dims: config.dims,
      timeout,
    })
  }
}

/// Extract `data[0].embedding` from an embeddings response.
pub(crate) fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>, ProviderError> {
  let embedding = json
    .get("data")
    .and_then(|d| d.get(0))
    .and_then(|d| d.get("embedding"))
    .ok_or_else(|| ProviderError::Malformed("missing data[0].embedding".into()))?;
  floats(embedding, "embedding")
}

impl Embedder for OpenAiEmbedder {
  fn model_name(&self) -> &str { &self.model }

  fn dims(&self) -> usize { self.dims }

  async fn embed<'a>(&'a self, text: &'a str) -> Result<Vec<f32>, ProviderError> {
    let req = self
      .client
      .post(join_url(&self.base_url, "v1/embeddings"))
      .bearer_auth(&self.api_key)
      .json(&json!({ "model": self.model, "input": text }));
    let body = send_json(req, self.timeout).await?;
    finish(parse_openai_response(&body)?, self.dims)
  }
}

// ─── Ollama ──────────────────────────────────────────────────────────────────

/// Embeddings from a local Ollama instance (`POST /api/embed`).
pub struct OllamaEmbedder {
  client:   reqwest::Client,
  base_url: String,
  model:    String,
  dims:     usize,
  timeout:  Duration,
}

impl OllamaEmbedder {
  pub fn new(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    Ok(Self {
      client: client(timeout)?,
      base_url: config.url.clone().unwrap_or_else(|| "http://localhost:11434".into()),
      model: config.model()?,
      dims: config.dims,
      timeout,
    })
  }
}

/// Extract `embeddings[0]` from an Ollama embed response.
pub(crate) fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<f32>, ProviderError> {
  let embedding = json
    .get("embeddings")
    .and_then(|e| e.get(0))
    .ok_or_else(|| ProviderError::Malformed("missing embeddings[0]".into()))?;
  floats(embedding, "embedding")
}

impl Embedder for OllamaEmbedder {
  fn model_name(&self) -> &str { &self.model }

  fn dims(&self) -> usize { self.dims }

  async fn embed<'a>(&'a self, text: &'a str) -> Result<Vec<f32>, ProviderError> {
    let req = self
      .client
      .post(join_url(&self.base_url, "api/embed"))
      .json(&json!({ "model": self.model, "input": text }));
    let body = send_json(req, self.timeout).await?;
    finish(parse_ollama_response(&body)?, self.dims)
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Whichever embedder the configuration selected.
pub enum AnyEmbedder {
  OpenAi(OpenAiEmbedder),
  Ollama(OllamaEmbedder),
  Hash(HashEmbedder),
}

/// Build the embedder described by `config`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<AnyEmbedder, ProviderError> {
  if config.dims == 0 {
    return Err(ProviderError::Config("embedding.dims must be positive".into()));
  }
  let embedder = match config.provider {
    EmbeddingKind::Openai => AnyEmbedder::OpenAi(OpenAiEmbedder::new(config)?),
    EmbeddingKind::Ollama => AnyEmbedder::Ollama(OllamaEmbedder::new(config)?),
    EmbeddingKind::Hash => AnyEmbedder::Hash(HashEmbedder::new(config.dims)),
  };
  tracing::info!(model = embedder.model_name(), dims = config.dims, "embedder ready");
  Ok(embedder)
}

impl Embedder for AnyEmbedder {
  fn model_name(&self) -> &str {
    match self {
      AnyEmbedder::OpenAi(e) => e.model_name(),
      AnyEmbedder::Ollama(e) => e.model_name(),
      AnyEmbedder::Hash(e) => e.model_name(),
    }
  }

  fn dims(&self) -> usize {
    match self {
      AnyEmbedder::OpenAi(e) => e.dims(),
      AnyEmbedder::Ollama(e) => e.dims(),
      AnyEmbedder::Hash(e) => e.dims(),
    }
  }

  async fn embed<'a>(&'a self, text: &'a str) -> Result<Vec<f32>, ProviderError> {
    match self {
      AnyEmbedder::OpenAi(e) => e.embed(text).await,
      AnyEmbedder::Ollama(e) => e.embed(text).await,
      AnyEmbedder::Hash(e) => e.embed(text).await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_openai_embeddings() {
    let body = json!({ "data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3] }] });
    assert_eq!(parse_openai_response(&body).unwrap(), [0.1, 0.2, 0.3]);
  }

  #[test]
  fn parses_ollama_embeddings() {
    let body = json!({ "model": "nomic-embed-text", "embeddings": [[0.5, -0.5]] });
    assert_eq!(parse_ollama_response(&body).unwrap(), [0.5, -0.5]);
  }

  #[test]
  fn missing_payload_is_malformed() {
    assert!(matches!(
      parse_openai_response(&json!({ "data": [] })),
      Err(ProviderError::Malformed(_))
    ));
    assert!(matches!(
      parse_ollama_response(&json!({ "error": "model not found" })),
      Err(ProviderError::Malformed(_))
    ));
  }

  #[test]
  fn ollama_requires_a_model() {
    let mut config = EmbeddingConfig::hash(4);
    config.provider = EmbeddingKind::Ollama;
    assert!(matches!(create_embedder(&config), Err(ProviderError::Config(_))));
  }

  #[tokio::test]
  async fn hash_config_builds_a_hash_embedder() {
    let e = create_embedder(&EmbeddingConfig::hash(16)).unwrap();
    assert!(matches!(e, AnyEmbedder::Hash(_)));
    assert_eq!(e.dims(), 16);
    assert_eq!(e.embed("cough").await.unwrap().len(), 16);
  }

  #[test]
  fn zero_dims_are_rejected() {
    assert!(create_embedder(&EmbeddingConfig::hash(0)).is_err());
  }
}
