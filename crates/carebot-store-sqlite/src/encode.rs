//! Encoding and decoding helpers between carebot record types and the plain
//! column values stored in SQLite.
//!
//! Datetimes are stored as canonical `YYYY-MM-DD HH:MM:SS` text, so text
//! ordering is chronological. Embeddings cross into SQL as JSON text and are
//! stored as blobs by `to_vector`.

use carebot_core::{
  record::{
    ActivityRecord, DietRecord, MedicalRecord, PromptRecord, ScoredRecord, Timestamp,
    VitalsRecord,
  },
  vector,
};

use crate::{Error, Result};

// ─── Timestamp ───────────────────────────────────────────────────────────────

pub fn encode_ts(ts: Timestamp) -> String { ts.to_string() }

pub fn decode_ts(s: &str) -> Result<Timestamp> {
  s.parse().map_err(|e: carebot_core::Error| Error::DateParse(e.to_string()))
}

// ─── Embedding ───────────────────────────────────────────────────────────────

/// JSON array literal handed to `to_vector(?)`.
pub fn encode_embedding(v: &[f32]) -> Result<String> { Ok(serde_json::to_string(v)?) }

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Raw column values read from a `medical_records` row.
pub struct RawMedical {
  pub user_id:   String,
  pub symptom:   String,
  pub diagnosis: String,
  pub datetime:  String,
  pub embedding: Vec<u8>,
}

impl RawMedical {
  pub const COLUMNS: &str = "user_id, symptom, diagnosis, datetime, embedding";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:   row.get(0)?,
      symptom:   row.get(1)?,
      diagnosis: row.get(2)?,
      datetime:  row.get(3)?,
      embedding: row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<MedicalRecord> {
    Ok(MedicalRecord {
      user_id:   self.user_id,
      symptom:   self.symptom,
      diagnosis: self.diagnosis,
      datetime:  decode_ts(&self.datetime)?,
      embedding: vector::from_blob(&self.embedding),
    })
  }
}

/// A [`RawMedical`] row with its similarity score in column 5.
pub struct RawScored {
  pub row:   RawMedical,
  pub score: f64,
}

impl RawScored {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { row: RawMedical::from_row(row)?, score: row.get(5)? })
  }

  pub fn into_scored(self) -> Result<ScoredRecord> {
    Ok(ScoredRecord { record: self.row.into_record()?, score: self.score as f32 })
  }
}

pub struct RawVitals {
  pub user_id:        String,
  pub temperature:    f64,
  pub blood_pressure: String,
  pub pulse_rate:     f64,
  pub datetime:       String,
}

impl RawVitals {
  pub const COLUMNS: &str = "user_id, temperature, blood_pressure, pulse_rate, datetime";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:        row.get(0)?,
      temperature:    row.get(1)?,
      blood_pressure: row.get(2)?,
      pulse_rate:     row.get(3)?,
      datetime:       row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<VitalsRecord> {
    Ok(VitalsRecord {
      user_id:        self.user_id,
      temperature:    self.temperature,
      blood_pressure: self.blood_pressure,
      pulse_rate:     self.pulse_rate,
      datetime:       decode_ts(&self.datetime)?,
    })
  }
}

pub struct RawActivity {
  pub user_id:  String,
  pub activity: String,
  pub duration: f64,
  pub datetime: String,
}

impl RawActivity {
  pub const COLUMNS: &str = "user_id, activity, duration, datetime";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:  row.get(0)?,
      activity: row.get(1)?,
      duration: row.get(2)?,
      datetime: row.get(3)?,
    })
  }

  pub fn into_record(self) -> Result<ActivityRecord> {
    Ok(ActivityRecord {
      user_id:  self.user_id,
      activity: self.activity,
      duration: self.duration,
      datetime: decode_ts(&self.datetime)?,
    })
  }
}

pub struct RawPrompt {
  pub user_id:  String,
  pub summary:  String,
  pub datetime: String,
}

impl RawPrompt {
  pub const COLUMNS: &str = "user_id, summary, datetime";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { user_id: row.get(0)?, summary: row.get(1)?, datetime: row.get(2)? })
  }

  pub fn into_record(self) -> Result<PromptRecord> {
    Ok(PromptRecord {
      user_id:  self.user_id,
      summary:  self.summary,
      datetime: decode_ts(&self.datetime)?,
    })
  }
}

pub struct RawDiet {
  pub user_id:  String,
  pub meal:     String,
  pub calories: f64,
  pub datetime: String,
}

impl RawDiet {
  pub const COLUMNS: &str = "user_id, meal, calories, datetime";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:  row.get(0)?,
      meal:     row.get(1)?,
      calories: row.get(2)?,
      datetime: row.get(3)?,
    })
  }

  pub fn into_record(self) -> Result<DietRecord> {
    Ok(DietRecord {
      user_id:  self.user_id,
      meal:     self.meal,
      calories: self.calories,
      datetime: decode_ts(&self.datetime)?,
    })
  }
}
