//! Typed insert and query operations over a [`RecordStore`].
//!
//! The keeper owns the embedding step: a [`NewMedicalRecord`] goes in, the
//! keeper embeds `symptom + " " + diagnosis` and hands the store a complete
//! [`MedicalRecord`]. Store failures surface as
//! [`Error::StoreWrite`]/[`Error::StoreRead`] and are never retried here.

use std::sync::Arc;

use crate::{
  Error, Result,
  provider::{Embedder, ProviderError},
  record::{
    ActivityRecord, DietRecord, MedicalRecord, NewMedicalRecord, PromptRecord,
    ScoredRecord, Table, Timestamp, UserRecord, VitalsRecord,
  },
  retry::RetryPolicy,
  store::RecordStore,
  vector,
};

/// Application-level access to patient records.
pub struct RecordKeeper<S, E> {
  store:    Arc<S>,
  embedder: Arc<E>,
  retry:    RetryPolicy,
}

fn require_user(user_id: &str) -> Result<()> {
  if user_id.trim().is_empty() {
    return Err(Error::Validation("Missing field User_ID".into()));
  }
  Ok(())
}

impl<S: RecordStore, E: Embedder> RecordKeeper<S, E> {
  /// Pair a store with an embedder. Both must agree on dimensionality.
  pub fn new(store: Arc<S>, embedder: Arc<E>, retry: RetryPolicy) -> Result<Self> {
    if store.dims() != embedder.dims() {
      return Err(Error::Config(format!(
        "embedder {:?} produces {} dimensions but the store holds {}",
        embedder.model_name(),
        embedder.dims(),
        store.dims()
      )));
    }
    Ok(Self { store, embedder, retry })
  }

  pub fn embedder(&self) -> &E { &self.embedder }

  /// Embed `text`, retrying transient provider failures. The result is
  /// checked for length and unit norm.
  pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
    let embedder = &*self.embedder;
    let v = self.retry.run("embed", move || embedder.embed(text)).await?;

    if v.len() != embedder.dims() {
      return Err(
        ProviderError::Dimension { expected: embedder.dims(), actual: v.len() }.into(),
      );
    }
    if !vector::is_unit(&v) {
      return Err(
        ProviderError::Malformed(format!(
          "embedding norm is {}, expected 1",
          vector::l2_norm(&v)
        ))
        .into(),
      );
    }
    Ok(v)
  }

  // ─── Writes ────────────────────────────────────────────────────────────────

  pub async fn insert_medical(&self, new: NewMedicalRecord) -> Result<()> {
    require_user(&new.user_id)?;
    let embedding = self.embed(&new.embedding_text()).await?;
    let record = MedicalRecord::from_new(new, embedding);
    tracing::debug!(user = %record.user_id, datetime = %record.datetime, "inserting medical record");
    self.store.insert_medical(record).await.map_err(Error::write)
  }

  pub async fn insert_vitals(&self, record: VitalsRecord) -> Result<()> {
    require_user(&record.user_id)?;
    self.store.insert_vitals(record).await.map_err(Error::write)
  }

  pub async fn insert_activity(&self, record: ActivityRecord) -> Result<()> {
    require_user(&record.user_id)?;
    self.store.insert_activity(record).await.map_err(Error::write)
  }

  /// Store a conversation summary. A missing `datetime` is stamped with the
  /// current local time.
  pub async fn insert_prompt(
    &self,
    user_id: &str,
    summary: &str,
    datetime: Option<Timestamp>,
  ) -> Result<()> {
    require_user(user_id)?;
    let record = PromptRecord {
      user_id:  user_id.to_owned(),
      summary:  summary.to_owned(),
      datetime: datetime.unwrap_or_else(Timestamp::now),
    };
    self.store.insert_prompt(record).await.map_err(Error::write)
  }

  pub async fn insert_diet(&self, record: DietRecord) -> Result<()> {
    require_user(&record.user_id)?;
    self.store.insert_diet(record).await.map_err(Error::write)
  }

  // ─── Reads ─────────────────────────────────────────────────────────────────

  pub async fn query_by_user(&self, table: Table, user_id: &str) -> Result<Vec<UserRecord>> {
    require_user(user_id)?;
    self.store.query_by_user(table, user_id).await.map_err(Error::read)
  }

  /// Top-`k` medical records of `user_id` by similarity to an already
  /// computed query embedding.
  pub async fn query_similar_medical(
    &self,
    user_id: &str,
    query: &[f32],
    k: usize,
  ) -> Result<Vec<ScoredRecord>> {
    require_user(user_id)?;
    self
      .store
      .query_similar_medical(user_id, query, k)
      .await
      .map_err(Error::read)
  }

  /// Embed `text` and return the `k` most similar medical records of
  /// `user_id`, best first. No matches is an empty vector.
  pub async fn retrieve_similar(
    &self,
    user_id: &str,
    text: &str,
    k: usize,
  ) -> Result<Vec<MedicalRecord>> {
    require_user(user_id)?;
    let query = self.embed(text).await?;
    let hits = self.query_similar_medical(user_id, &query, k).await?;
    tracing::debug!(user = user_id, hits = hits.len(), "retrieved similar records");
    Ok(hits.into_iter().map(|h| h.record).collect())
  }
}
