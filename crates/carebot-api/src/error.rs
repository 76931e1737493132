//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use carebot_core::provider::ProviderError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("provider error: {0}")]
  Provider(#[from] ProviderError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<carebot_core::Error> for ApiError {
  fn from(e: carebot_core::Error) -> Self {
    use carebot_core::Error as E;
    match e {
      E::Validation(m) => ApiError::BadRequest(m),
      E::UnknownTopic(t) => ApiError::NotFound(format!("unknown topic {t:?}")),
      E::TopicBusy(t) => ApiError::Conflict(format!("topic {t:?} is still answering")),
      E::Provider(p) => ApiError::Provider(p),
      E::StoreWrite(s) | E::StoreRead(s) => ApiError::Store(s),
      E::Config(m) => ApiError::Internal(m),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Provider(ProviderError::Timeout(_)) => {
        tracing::warn!(error = %self, "provider timed out");
        (StatusCode::GATEWAY_TIMEOUT, "the assistant took too long to answer".into())
      }
      ApiError::Provider(e) => {
        tracing::warn!(error = %e, "provider call failed");
        (StatusCode::BAD_GATEWAY, "the assistant is unavailable".into())
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "record store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "record store failure".into())
      }
      ApiError::Internal(m) => {
        tracing::error!(error = %m, "internal error");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
