//! Embedding and chat-completion providers for carebot.
//!
//! - [`OpenAiEmbedder`]: OpenAI-compatible `POST /v1/embeddings`.
//! - [`OllamaEmbedder`]: local Ollama `POST /api/embed`.
//! - [`HashEmbedder`]: offline feature-hashing embedder, no network.
//! - [`OpenAiChat`]: chat completions against OpenAI or an Azure OpenAI
//!   deployment.
//!
//! Each call here is a single attempt bounded by the client timeout.
//! Retries and backoff are applied by the caller through
//! [`carebot_core::retry::RetryPolicy`].

mod chat;
mod config;
mod embed;
mod hash;
mod http;

pub use chat::OpenAiChat;
pub use config::{ChatConfig, ChatFlavor, EmbeddingConfig, EmbeddingKind};
pub use embed::{AnyEmbedder, OllamaEmbedder, OpenAiEmbedder, create_embedder};
pub use hash::HashEmbedder;
