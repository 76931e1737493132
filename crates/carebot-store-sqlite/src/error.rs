//! Error type for `carebot-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// Either the database was created for a different embedding size, or a
  /// vector of the wrong size was handed to the store.
  #[error("expected {expected}-dimensional embeddings, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
