//! The [`Embedder`] and [`ChatProvider`] traits and their message types.
//!
//! Concrete implementations (OpenAI-compatible HTTP, Ollama, the offline hash
//! embedder) live in `carebot-providers`. The conversation manager only sees
//! these traits, which keeps it testable with in-process stubs.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Failure of an embedding or chat-completion call.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
  #[error("provider call timed out after {0:?}")]
  Timeout(Duration),

  #[error("provider returned HTTP {status}: {body}")]
  Http { status: u16, body: String },

  #[error("provider unreachable: {0}")]
  Transport(String),

  #[error("malformed provider response: {0}")]
  Malformed(String),

  #[error("embedding has {actual} dimensions, expected {expected}")]
  Dimension { expected: usize, actual: usize },

  #[error("provider misconfigured: {0}")]
  Config(String),
}

impl ProviderError {
  /// Whether retrying the same call may succeed: timeouts, connection
  /// failures, rate limiting and server errors.
  pub fn is_transient(&self) -> bool {
    match self {
      ProviderError::Timeout(_) | ProviderError::Transport(_) => true,
      ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
      ProviderError::Malformed(_)
      | ProviderError::Dimension { .. }
      | ProviderError::Config(_) => false,
    }
  }
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

/// One chat message. Conversation history holds only `user` and
/// `assistant` messages; `system` messages are synthesised per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub role:    Role,
  pub content: String,
}

impl Message {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: Role::System, content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self { role: Role::Assistant, content: content.into() }
  }
}

/// Everything a chat-completion call needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
  pub messages:    Vec<Message>,
  pub max_tokens:  u32,
  pub temperature: f32,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Turns text into a fixed-length, L2-normalised vector.
///
/// Implementations must be deterministic for identical input and must always
/// return exactly [`dims`](Embedder::dims) components.
pub trait Embedder: Send + Sync {
  /// Model identifier, for logging.
  fn model_name(&self) -> &str;

  /// Dimensionality of every vector this embedder produces.
  fn dims(&self) -> usize;

  fn embed<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<Vec<f32>, ProviderError>> + Send + 'a;
}

/// A hosted or local chat-completion endpoint.
pub trait ChatProvider: Send + Sync {
  /// Return the assistant's reply text for `request`.
  fn complete<'a>(
    &'a self,
    request: &'a ChatRequest,
  ) -> impl Future<Output = Result<String, ProviderError>> + Send + 'a;
}
