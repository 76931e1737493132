//! The `RecordStore` trait.
//!
//! Implemented by storage backends (e.g. `carebot-store-sqlite`, or the
//! in-process [`memory::MemoryStore`]). Higher layers depend on this
//! abstraction through [`RecordKeeper`](crate::keeper::RecordKeeper), not on
//! any concrete backend.

pub mod memory;

use std::future::Future;

use crate::record::{
  ActivityRecord, DietRecord, MedicalRecord, PromptRecord, ScoredRecord, Table,
  UserRecord, VitalsRecord,
};

/// Abstraction over a patient record store.
///
/// All writes are single-statement appends; there is no update or delete
/// path and no transaction spans more than one table.
///
/// All methods return `Send` futures so the trait can be used behind axum
/// handlers on a multi-threaded runtime.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Dimensionality every stored medical-record embedding must have.
  fn dims(&self) -> usize;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a medical record. Its embedding must already be computed and
  /// have [`dims`](RecordStore::dims) components.
  fn insert_medical(
    &self,
    record: MedicalRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_vitals(
    &self,
    record: VitalsRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_activity(
    &self,
    record: ActivityRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_prompt(
    &self,
    record: PromptRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_diet(
    &self,
    record: DietRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All rows of `table` belonging to `user_id`, in store-native order.
  /// Callers must sort client-side if they need chronological order.
  fn query_by_user<'a>(
    &'a self,
    table: Table,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Vec<UserRecord>, Self::Error>> + Send + 'a;

  /// At most `k` medical records of `user_id`, ordered by descending dot
  /// product with `query`; equal scores are ordered by datetime, newest
  /// first.
  fn query_similar_medical<'a>(
    &'a self,
    user_id: &'a str,
    query: &'a [f32],
    k: usize,
  ) -> impl Future<Output = Result<Vec<ScoredRecord>, Self::Error>> + Send + 'a;
}
