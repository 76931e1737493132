//! Serde-deserialisable provider settings.
//!
//! API keys are never part of the checked-in config file: set `api_key`
//! through the environment (e.g. `CAREBOT_CHAT__API_KEY`) or name a
//! variable to read it from with `api_key_env`.

use serde::Deserialize;

use carebot_core::provider::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
  Openai,
  Ollama,
  Hash,
}

#[derive(Clone, Deserialize)]
pub struct EmbeddingConfig {
  pub provider:     EmbeddingKind,
  /// Model name; ignored by the hash embedder.
  #[serde(default)]
  pub model:        Option<String>,
  pub dims:         usize,
  /// Base URL override, e.g. `http://localhost:11434` for Ollama.
  #[serde(default)]
  pub url:          Option<String>,
  #[serde(default)]
  pub api_key:      Option<String>,
  #[serde(default)]
  pub api_key_env:  Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl EmbeddingConfig {
  /// Offline embeddings of `dims` components.
  pub fn hash(dims: usize) -> Self {
    Self {
      provider: EmbeddingKind::Hash,
      model: None,
      dims,
      url: None,
      api_key: None,
      api_key_env: None,
      timeout_secs: default_timeout_secs(),
    }
  }

  pub(crate) fn model(&self) -> Result<String, ProviderError> {
    self
      .model
      .clone()
      .ok_or_else(|| ProviderError::Config("embedding.model is required".into()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatFlavor {
  #[default]
  Openai,
  Azure,
}

#[derive(Clone, Deserialize)]
pub struct ChatConfig {
  #[serde(default)]
  pub flavor:       ChatFlavor,
  /// `https://api.openai.com` or `https://<resource>.openai.azure.com`.
  #[serde(default = "default_chat_endpoint")]
  pub endpoint:     String,
  /// Model name, or the deployment name for Azure.
  #[serde(default = "default_chat_model")]
  pub model:        String,
  #[serde(default = "default_api_version")]
  pub api_version:  String,
  #[serde(default)]
  pub api_key:      Option<String>,
  #[serde(default)]
  pub api_key_env:  Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ChatConfig {
  fn default() -> Self {
    Self {
      flavor:       ChatFlavor::default(),
      endpoint:     default_chat_endpoint(),
      model:        default_chat_model(),
      api_version:  default_api_version(),
      api_key:      None,
      api_key_env:  None,
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_timeout_secs() -> u64 { 30 }

fn default_chat_endpoint() -> String { "https://api.openai.com".into() }

fn default_chat_model() -> String { "gpt-4".into() }

fn default_api_version() -> String { "2024-08-01-preview".into() }

/// Pick the API key: an explicit value first, then the variable named by
/// `api_key_env`, then `fallback_env`.
pub(crate) fn resolve_api_key(
  api_key: Option<&str>,
  api_key_env: Option<&str>,
  fallback_env: &str,
) -> Result<String, ProviderError> {
  if let Some(key) = api_key.filter(|k| !k.is_empty()) {
    return Ok(key.to_owned());
  }
  let var = api_key_env.unwrap_or(fallback_env);
  std::env::var(var)
    .ok()
    .filter(|k| !k.is_empty())
    .ok_or_else(|| ProviderError::Config(format!("no API key: set {var}")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn explicit_key_wins() {
    let key = resolve_api_key(Some("sk-test"), Some("CAREBOT_UNSET_VAR"), "ALSO_UNSET").unwrap();
    assert_eq!(key, "sk-test");
  }

  #[test]
  fn missing_key_is_a_config_error() {
    let err = resolve_api_key(None, Some("CAREBOT_TEST_SURELY_UNSET_KEY"), "X").unwrap_err();
    assert!(matches!(err, ProviderError::Config(ref m) if m.contains("CAREBOT_TEST_SURELY_UNSET_KEY")));
  }

  #[test]
  fn chat_config_defaults() {
    let c: ChatConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(c.flavor, ChatFlavor::Openai);
    assert_eq!(c.timeout_secs, 30);
  }

  #[test]
  fn embedding_config_parses() {
    let c: EmbeddingConfig =
      serde_json::from_str(r#"{"provider":"ollama","model":"nomic-embed-text","dims":768}"#)
        .unwrap();
    assert_eq!(c.provider, EmbeddingKind::Ollama);
    assert_eq!(c.dims, 768);
    assert!(c.url.is_none());
  }
}
