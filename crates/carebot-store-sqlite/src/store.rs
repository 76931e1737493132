//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::path::Path;

use carebot_core::{
  record::{
    ActivityRecord, DietRecord, MedicalRecord, PromptRecord, ScoredRecord, Table,
    UserRecord, VitalsRecord,
  },
  store::RecordStore,
};

use crate::{
  Error, Result,
  encode::{
    RawActivity, RawDiet, RawMedical, RawPrompt, RawScored, RawVitals, encode_embedding,
    encode_ts,
  },
  schema::{DIMS_KEY, schema},
  vector_fn,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A carebot record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  dims: usize,
}

fn select_by_user(columns: &str, table: &str) -> String {
  format!("SELECT {columns} FROM {table} WHERE user_id = ?1 ORDER BY rowid")
}

impl SqliteStore {
  /// Open (or create) a store at `path` for embeddings of `dims`
  /// components. Fails with [`Error::DimensionMismatch`] if the file was
  /// created for a different size.
  pub async fn open(path: impl AsRef<Path>, dims: usize) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, dims).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory(dims: usize) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, dims).await
  }

  async fn init(conn: tokio_rusqlite::Connection, dims: usize) -> Result<Self> {
    let configured = dims as i64;
    let stored: i64 = conn
      .call(move |conn| {
        vector_fn::register(conn)?;
        conn.execute_batch(&schema(dims))?;
        conn.execute(
          "INSERT OR IGNORE INTO store_meta (key, value) VALUES (?1, ?2)",
          rusqlite::params![DIMS_KEY, configured],
        )?;
        Ok(conn.query_row(
          "SELECT value FROM store_meta WHERE key = ?1",
          rusqlite::params![DIMS_KEY],
          |r| r.get(0),
        )?)
      })
      .await?;

    if stored != configured {
      return Err(Error::DimensionMismatch { expected: dims, actual: stored as usize });
    }
    tracing::debug!(dims, "sqlite store ready");
    Ok(Self { conn, dims })
  }

  fn check_dims(&self, v: &[f32]) -> Result<()> {
    if v.len() != self.dims {
      return Err(Error::DimensionMismatch { expected: self.dims, actual: v.len() });
    }
    Ok(())
  }

  /// Run a `WHERE user_id = ?1` select and read every row with `read`.
  async fn select_user<R, F>(&self, sql: String, user_id: &str, read: F) -> Result<Vec<R>>
  where
    R: Send + 'static,
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<R> + Send + 'static,
  {
    let user_id = user_id.to_owned();
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn execute(&self, sql: &'static str, params: Vec<rusqlite::types::Value>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(sql, rusqlite::params_from_iter(params))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  fn dims(&self) -> usize { self.dims }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert_medical(&self, record: MedicalRecord) -> Result<()> {
    self.check_dims(&record.embedding)?;
    let embedding = encode_embedding(&record.embedding)?;

    self
      .execute(
        "INSERT INTO medical_records (user_id, symptom, diagnosis, datetime, embedding)
         VALUES (?1, ?2, ?3, ?4, to_vector(?5))",
        vec![
          record.user_id.into(),
          record.symptom.into(),
          record.diagnosis.into(),
          encode_ts(record.datetime).into(),
          embedding.into(),
        ],
      )
      .await
  }

  async fn insert_vitals(&self, record: VitalsRecord) -> Result<()> {
    self
      .execute(
        "INSERT INTO vitals (user_id, temperature, blood_pressure, pulse_rate, datetime)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        vec![
          record.user_id.into(),
          record.temperature.into(),
          record.blood_pressure.into(),
          record.pulse_rate.into(),
          encode_ts(record.datetime).into(),
        ],
      )
      .await
  }

  async fn insert_activity(&self, record: ActivityRecord) -> Result<()> {
    self
      .execute(
        "INSERT INTO activity (user_id, activity, duration, datetime) VALUES (?1, ?2, ?3, ?4)",
        vec![
          record.user_id.into(),
          record.activity.into(),
          record.duration.into(),
          encode_ts(record.datetime).into(),
        ],
      )
      .await
  }

  async fn insert_prompt(&self, record: PromptRecord) -> Result<()> {
    self
      .execute(
        "INSERT INTO past_prompts (user_id, summary, datetime) VALUES (?1, ?2, ?3)",
        vec![
          record.user_id.into(),
          record.summary.into(),
          encode_ts(record.datetime).into(),
        ],
      )
      .await
  }

  async fn insert_diet(&self, record: DietRecord) -> Result<()> {
    self
      .execute(
        "INSERT INTO diet (user_id, meal, calories, datetime) VALUES (?1, ?2, ?3, ?4)",
        vec![
          record.user_id.into(),
          record.meal.into(),
          record.calories.into(),
          encode_ts(record.datetime).into(),
        ],
      )
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn query_by_user<'a>(&'a self, table: Table, user_id: &'a str) -> Result<Vec<UserRecord>> {
    match table {
      Table::Medical => self
        .select_user(
          select_by_user(RawMedical::COLUMNS, "medical_records"),
          user_id,
          RawMedical::from_row,
        )
        .await?
        .into_iter()
        .map(|r| r.into_record().map(UserRecord::Medical))
        .collect(),
      Table::Vitals => self
        .select_user(select_by_user(RawVitals::COLUMNS, "vitals"), user_id, RawVitals::from_row)
        .await?
        .into_iter()
        .map(|r| r.into_record().map(UserRecord::Vitals))
        .collect(),
      Table::Activity => self
        .select_user(
          select_by_user(RawActivity::COLUMNS, "activity"),
          user_id,
          RawActivity::from_row,
        )
        .await?
        .into_iter()
        .map(|r| r.into_record().map(UserRecord::Activity))
        .collect(),
      Table::Prompts => self
        .select_user(
          select_by_user(RawPrompt::COLUMNS, "past_prompts"),
          user_id,
          RawPrompt::from_row,
        )
        .await?
        .into_iter()
        .map(|r| r.into_record().map(UserRecord::Prompt))
        .collect(),
      Table::Diet => self
        .select_user(select_by_user(RawDiet::COLUMNS, "diet"), user_id, RawDiet::from_row)
        .await?
        .into_iter()
        .map(|r| r.into_record().map(UserRecord::Diet))
        .collect(),
    }
  }

  async fn query_similar_medical<'a>(
    &'a self,
    user_id: &'a str,
    query: &'a [f32],
    k: usize,
  ) -> Result<Vec<ScoredRecord>> {
    self.check_dims(query)?;
    let query_json = encode_embedding(query)?;
    let user_id = user_id.to_owned();
    let limit = i64::try_from(k).unwrap_or(i64::MAX);

    let raws: Vec<RawScored> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {}, vector_dot_product(embedding, to_vector(?2)) AS score
           FROM medical_records
           WHERE user_id = ?1
           ORDER BY score DESC, datetime DESC, rowid DESC
           LIMIT ?3",
          RawMedical::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, query_json, limit], RawScored::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawScored::into_scored).collect()
  }
}
