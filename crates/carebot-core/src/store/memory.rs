//! In-memory [`RecordStore`] for tests, demos and offline runs.
//!
//! Rows live in `Vec`s behind `tokio::sync::RwLock`. Similarity search is a
//! brute-force dot product over the user's medical records.

use std::cmp::Ordering;

use thiserror::Error;
use tokio::sync::RwLock;

use super::RecordStore;
use crate::{
  record::{
    ActivityRecord, DietRecord, MedicalRecord, PromptRecord, ScoredRecord, Table,
    UserRecord, VitalsRecord,
  },
  vector,
};

#[derive(Debug, Error)]
pub enum MemoryStoreError {
  #[error("embedding has {actual} dimensions, store expects {expected}")]
  DimensionMismatch { expected: usize, actual: usize },
}

/// A [`RecordStore`] that keeps everything in process memory.
pub struct MemoryStore {
  dims:     usize,
  medical:  RwLock<Vec<MedicalRecord>>,
  vitals:   RwLock<Vec<VitalsRecord>>,
  activity: RwLock<Vec<ActivityRecord>>,
  prompts:  RwLock<Vec<PromptRecord>>,
  diet:     RwLock<Vec<DietRecord>>,
}

impl MemoryStore {
  pub fn new(dims: usize) -> Self {
    Self {
      dims,
      medical: RwLock::default(),
      vitals: RwLock::default(),
      activity: RwLock::default(),
      prompts: RwLock::default(),
      diet: RwLock::default(),
    }
  }

  fn check_dims(&self, v: &[f32]) -> Result<(), MemoryStoreError> {
    if v.len() != self.dims {
      return Err(MemoryStoreError::DimensionMismatch {
        expected: self.dims,
        actual:   v.len(),
      });
    }
    Ok(())
  }
}

fn owned_by<T: Clone>(
  rows: &[T],
  user_id: &str,
  owner: impl Fn(&T) -> &str,
  wrap: impl Fn(T) -> UserRecord,
) -> Vec<UserRecord> {
  rows
    .iter()
    .filter(|r| owner(*r) == user_id)
    .cloned()
    .map(wrap)
    .collect()
}

impl RecordStore for MemoryStore {
  type Error = MemoryStoreError;

  fn dims(&self) -> usize { self.dims }

  async fn insert_medical(&self, record: MedicalRecord) -> Result<(), Self::Error> {
    self.check_dims(&record.embedding)?;
    self.medical.write().await.push(record);
    Ok(())
  }

  async fn insert_vitals(&self, record: VitalsRecord) -> Result<(), Self::Error> {
    self.vitals.write().await.push(record);
    Ok(())
  }

  async fn insert_activity(&self, record: ActivityRecord) -> Result<(), Self::Error> {
    self.activity.write().await.push(record);
    Ok(())
  }

  async fn insert_prompt(&self, record: PromptRecord) -> Result<(), Self::Error> {
    self.prompts.write().await.push(record);
    Ok(())
  }

  async fn insert_diet(&self, record: DietRecord) -> Result<(), Self::Error> {
    self.diet.write().await.push(record);
    Ok(())
  }

  async fn query_by_user<'a>(
    &'a self,
    table: Table,
    user_id: &'a str,
  ) -> Result<Vec<UserRecord>, Self::Error> {
    let rows = match table {
      Table::Medical => owned_by(
        &self.medical.read().await,
        user_id,
        |r| r.user_id.as_str(),
        UserRecord::Medical,
      ),
      Table::Vitals => owned_by(
        &self.vitals.read().await,
        user_id,
        |r| r.user_id.as_str(),
        UserRecord::Vitals,
      ),
      Table::Activity => owned_by(
        &self.activity.read().await,
        user_id,
        |r| r.user_id.as_str(),
        UserRecord::Activity,
      ),
      Table::Prompts => owned_by(
        &self.prompts.read().await,
        user_id,
        |r| r.user_id.as_str(),
        UserRecord::Prompt,
      ),
      Table::Diet => owned_by(
        &self.diet.read().await,
        user_id,
        |r| r.user_id.as_str(),
        UserRecord::Diet,
      ),
    };
    Ok(rows)
  }

  async fn query_similar_medical<'a>(
    &'a self,
    user_id: &'a str,
    query: &'a [f32],
    k: usize,
  ) -> Result<Vec<ScoredRecord>, Self::Error> {
    self.check_dims(query)?;

    let mut scored: Vec<ScoredRecord> = self
      .medical
      .read()
      .await
      .iter()
      .filter(|r| r.user_id == user_id)
      .map(|r| ScoredRecord {
        score:  vector::dot(&r.embedding, query),
        record: r.clone(),
      })
      .collect();

    // Later inserts win ties on equal datetime, like rowid DESC in SQL.
    scored.reverse();
    scored.sort_by(|a, b| {
      b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.record.datetime.cmp(&a.record.datetime))
    });
    scored.truncate(k);
    Ok(scored)
  }
}
