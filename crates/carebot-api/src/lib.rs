//! JSON REST API for carebot.
//!
//! Exposes an axum [`Router`] over a shared [`ConversationManager`], which
//! also gives access to the record keeper. Auth, TLS and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", carebot_api::api_router(conversations.clone()))
//! ```

pub mod chat;
pub mod error;
pub mod records;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use carebot_core::{
  conversation::ConversationManager,
  provider::{ChatProvider, Embedder},
  store::RecordStore,
};

pub use error::ApiError;

/// Handler state: the process-wide conversation manager.
pub type Shared<S, E, C> = Arc<ConversationManager<S, E, C>>;

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, E, C>(conversations: Shared<S, E, C>) -> Router<()>
where
  S: RecordStore + 'static,
  E: Embedder + 'static,
  C: ChatProvider + 'static,
{
  Router::new()
    // Inserts
    .route("/insert/medical", post(records::insert_medical::<S, E, C>))
    .route("/insert/vitals", post(records::insert_vitals::<S, E, C>))
    .route("/insert/activity", post(records::insert_activity::<S, E, C>))
    .route("/insert/prompt", post(records::insert_prompt::<S, E, C>))
    .route("/insert/diet", post(records::insert_diet::<S, E, C>))
    // Queries
    .route("/medical", get(records::similar_medical::<S, E, C>))
    .route("/vitals", get(records::list_vitals::<S, E, C>))
    .route("/activity", get(records::list_activity::<S, E, C>))
    .route("/prompts", get(records::list_prompts::<S, E, C>))
    .route("/diet", get(records::list_diet::<S, E, C>))
    // Chat
    .route("/topics", get(chat::topics::<S, E, C>))
    .route("/chat/{topic}", post(chat::send::<S, E, C>).delete(chat::clear::<S, E, C>))
    .route("/chat/{topic}/history", get(chat::history::<S, E, C>))
    .with_state(conversations)
}
