//! SQL schema for the carebot SQLite store.
//!
//! Executed on every open. The `medical_records.embedding` width is baked
//! into a CHECK constraint, and `store_meta` remembers the dimensionality
//! the file was created with so a later open with a different embedder is
//! refused.

/// Key in `store_meta` holding the embedding dimensionality.
pub const DIMS_KEY: &str = "embedding_dims";

/// Full schema DDL for embeddings of `dims` components; idempotent thanks to
/// `CREATE TABLE IF NOT EXISTS`.
pub fn schema(dims: usize) -> String {
  let bytes = dims * 4;
  format!(
    "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS store_meta (
    key    TEXT PRIMARY KEY,
    value  INTEGER NOT NULL
);

-- Every table is append-only; rows are never updated or deleted.
CREATE TABLE IF NOT EXISTS medical_records (
    user_id    TEXT NOT NULL,
    symptom    TEXT NOT NULL,
    diagnosis  TEXT NOT NULL,
    datetime   TEXT NOT NULL,   -- YYYY-MM-DD HH:MM:SS
    embedding  BLOB NOT NULL CHECK (length(embedding) = {bytes})
);

CREATE TABLE IF NOT EXISTS vitals (
    user_id         TEXT NOT NULL,
    temperature     REAL NOT NULL,
    blood_pressure  TEXT NOT NULL,
    pulse_rate      REAL NOT NULL,
    datetime        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activity (
    user_id   TEXT NOT NULL,
    activity  TEXT NOT NULL,
    duration  REAL NOT NULL,   -- minutes
    datetime  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS past_prompts (
    user_id   TEXT NOT NULL,
    summary   TEXT NOT NULL,
    datetime  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS diet (
    user_id   TEXT NOT NULL,
    meal      TEXT NOT NULL,
    calories  REAL NOT NULL,
    datetime  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS medical_user_idx  ON medical_records(user_id);
CREATE INDEX IF NOT EXISTS vitals_user_idx   ON vitals(user_id);
CREATE INDEX IF NOT EXISTS activity_user_idx ON activity(user_id);
CREATE INDEX IF NOT EXISTS prompts_user_idx  ON past_prompts(user_id);
CREATE INDEX IF NOT EXISTS diet_user_idx     ON diet(user_id);

PRAGMA user_version = 1;
"
  )
}
