//! Handlers for topics and chat turns.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/topics` | `[{id, title, retrieval}]` |
//! | `POST`   | `/chat/{topic}` | Body: `{user, text, max_tokens?, context?, remember?}` |
//! | `GET`    | `/chat/{topic}/history` | `[{role, content}]` |
//! | `DELETE` | `/chat/{topic}` | Clears the topic's history |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use carebot_core::{
  conversation::UserTurn,
  provider::{ChatProvider, Embedder, Message},
  store::RecordStore,
  topic::Topic,
};
use serde::{Deserialize, Serialize};

use crate::{Shared, error::ApiError};

/// Longest summary stored for a remembered exchange.
const SUMMARY_MAX_CHARS: usize = 1000;

/// `GET /topics`
pub async fn topics<S, E, C>(State(chat): State<Shared<S, E, C>>) -> Json<Vec<Topic>>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  Json(chat.topics().copied().collect())
}

// ─── Send ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendBody {
  pub user:       String,
  pub text:       String,
  #[serde(default)]
  pub max_tokens: Option<u32>,
  /// Appended to the topic's system prompt for this turn.
  #[serde(default)]
  pub context:    Option<String>,
  /// Store a summary of the exchange in the user's past prompts.
  #[serde(default)]
  pub remember:   bool,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
  pub reply: String,
}

fn summarize(topic: &str, text: &str, reply: &str) -> String {
  format!("[{topic}] {} => {}", text.trim(), reply.trim())
    .chars()
    .take(SUMMARY_MAX_CHARS)
    .collect()
}

/// `POST /chat/{topic}`; 204 when `text` is blank.
pub async fn send<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  Path(topic): Path<String>,
  body: Result<Json<SendBody>, JsonRejection>,
) -> Result<Response, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  let Json(body) = body?;
  let turn = UserTurn {
    context: body.context.as_deref(),
    max_tokens: body.max_tokens,
    ..UserTurn::new(&body.user, &body.text)
  };

  let Some(reply) = chat.respond(&topic, turn).await? else {
    return Ok(StatusCode::NO_CONTENT.into_response());
  };

  if body.remember {
    let summary = summarize(&topic, &body.text, &reply);
    if let Err(e) = chat.keeper().insert_prompt(&body.user, &summary, None).await {
      tracing::warn!(topic = %topic, user = %body.user, error = %e, "could not remember exchange");
    }
  }

  Ok(Json(SendResponse { reply }).into_response())
}

// ─── History / clear ─────────────────────────────────────────────────────────

/// `GET /chat/{topic}/history`
pub async fn history<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  Path(topic): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  Ok(Json(chat.history(&topic).await?))
}

/// `DELETE /chat/{topic}`
pub async fn clear<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  Path(topic): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  chat.clear(&topic).await?;
  Ok(StatusCode::NO_CONTENT)
}
