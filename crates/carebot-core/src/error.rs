//! Error types for `carebot-core`.

use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum Error {
  /// A caller-supplied value is missing or malformed.
  #[error("validation error: {0}")]
  Validation(String),

  /// The wiring of store and providers is inconsistent (e.g. vector sizes).
  #[error("configuration error: {0}")]
  Config(String),

  #[error("unknown topic: {0:?}")]
  UnknownTopic(String),

  /// A reply for this topic is already in flight.
  #[error("topic {0:?} is busy")]
  TopicBusy(String),

  #[error("provider error: {0}")]
  Provider(#[from] ProviderError),

  #[error("store write failed: {0}")]
  StoreWrite(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store read failed: {0}")]
  StoreRead(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn write<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreWrite(Box::new(e))
  }

  pub(crate) fn read<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreRead(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
