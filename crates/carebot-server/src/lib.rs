//! HTTP server assembly for carebot.
//!
//! Mounts the [`carebot_api`] router under `/api`, optionally behind HTTP
//! Basic auth, with request tracing.

pub mod auth;
pub mod error;
pub mod populate;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware};
use carebot_core::{
  conversation::ConversationSettings,
  provider::{ChatProvider, Embedder},
  retry::RetryPolicy,
  store::RecordStore,
};
use carebot_providers::{ChatConfig, EmbeddingConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `CAREBOT_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  /// Basic auth is enabled only when both of these are set.
  #[serde(default)]
  pub auth_username:      Option<String>,
  #[serde(default)]
  pub auth_password_hash: Option<String>,
  #[serde(default = "default_embedding")]
  pub embedding:          EmbeddingConfig,
  #[serde(default)]
  pub chat:               ChatConfig,
  #[serde(default)]
  pub conversation:       ConversationConfig,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 3000 }

fn default_store_path() -> PathBuf { PathBuf::from("carebot.db") }

fn default_embedding() -> EmbeddingConfig { EmbeddingConfig::hash(256) }

impl ServerConfig {
  pub fn auth(&self) -> Option<AuthConfig> {
    match (&self.auth_username, &self.auth_password_hash) {
      (Some(username), Some(password_hash)) => Some(AuthConfig {
        username:      username.clone(),
        password_hash: password_hash.clone(),
      }),
      _ => None,
    }
  }
}

/// Reply generation tunables, the `[conversation]` table.
///
/// Temperature and the number of retrieved records are fixed.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConversationConfig {
  pub default_max_tokens: u32,
  /// Must be at least 1.
  pub max_tokens_ceiling: u32,
  pub retry_attempts:     u32,
  pub retry_base_ms:      u64,
  /// Per-attempt bound on every provider call.
  pub timeout_secs:       u64,
}

impl Default for ConversationConfig {
  fn default() -> Self {
    let settings = ConversationSettings::default();
    Self {
      default_max_tokens: settings.default_max_tokens,
      max_tokens_ceiling: settings.max_tokens_ceiling,
      retry_attempts:     settings.retry.attempts,
      retry_base_ms:      settings.retry.base_delay.as_millis() as u64,
      timeout_secs:       settings.retry.timeout.as_secs(),
    }
  }
}

impl ConversationConfig {
  pub fn retry(&self) -> RetryPolicy {
    RetryPolicy {
      attempts:   self.retry_attempts,
      base_delay: Duration::from_millis(self.retry_base_ms),
      timeout:    Duration::from_secs(self.timeout_secs),
    }
  }

  pub fn settings(&self) -> ConversationSettings {
    ConversationSettings {
      default_max_tokens: self.default_max_tokens,
      max_tokens_ceiling: self.max_tokens_ceiling,
      retry:              self.retry(),
      ..ConversationSettings::default()
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's root [`Router`].
pub fn router<S, E, C>(conversations: carebot_api::Shared<S, E, C>, auth: Option<AuthConfig>) -> Router
where
  S: RecordStore + 'static,
  E: Embedder + 'static,
  C: ChatProvider + 'static,
{
  let mut api = carebot_api::api_router(conversations);
  if let Some(auth) = auth {
    api = api.layer(middleware::from_fn_with_state(Arc::new(auth), auth::require_auth));
  }
  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}
