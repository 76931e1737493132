//! Patient record types.
//!
//! Records are immutable once written: there is no update or delete path.
//! Field names serialise in the wire casing the mobile client expects
//! (`User_ID`, `Symptom`, `BloodPressure`, ...), so these types double as the
//! JSON shapes returned by the HTTP API.

use std::{fmt, str::FromStr};

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Timestamp ───────────────────────────────────────────────────────────────

/// Canonical record timestamp format, e.g. `2025-04-01 10:00:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A wall-clock timestamp with second precision.
///
/// Stored and transported as `YYYY-MM-DD HH:MM:SS`; the string form sorts in
/// chronological order.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
  /// The current local time, truncated to whole seconds.
  pub fn now() -> Self {
    let now = Local::now().naive_local();
    Self(now.with_nanosecond(0).unwrap_or(now))
  }
}

impl From<NaiveDateTime> for Timestamp {
  fn from(dt: NaiveDateTime) -> Self { Self(dt.with_nanosecond(0).unwrap_or(dt)) }
}

impl fmt::Display for Timestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
  }
}

impl FromStr for Timestamp {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
      .map(Self)
      .map_err(|e| {
        Error::Validation(format!(
          "invalid datetime {s:?} (expected YYYY-MM-DD HH:MM:SS): {e}"
        ))
      })
  }
}

impl TryFrom<String> for Timestamp {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<Timestamp> for String {
  fn from(ts: Timestamp) -> Self { ts.to_string() }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

/// The record tables a user's history is spread across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
  Medical,
  Vitals,
  Activity,
  Prompts,
  Diet,
}

impl Table {
  pub fn as_str(&self) -> &'static str {
    match self {
      Table::Medical => "medical",
      Table::Vitals => "vitals",
      Table::Activity => "activity",
      Table::Prompts => "prompts",
      Table::Diet => "diet",
    }
  }
}

impl fmt::Display for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Medical records ─────────────────────────────────────────────────────────

/// A symptom/diagnosis entry before its embedding has been computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewMedicalRecord {
  #[serde(rename = "User_ID")]
  pub user_id:   String,
  pub symptom:   String,
  pub diagnosis: String,
  pub datetime:  Timestamp,
}

impl NewMedicalRecord {
  /// The text the embedding is computed from: symptom and diagnosis joined
  /// by exactly one space.
  pub fn embedding_text(&self) -> String {
    format!("{} {}", self.symptom, self.diagnosis)
  }
}

/// A stored symptom/diagnosis entry together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MedicalRecord {
  #[serde(rename = "User_ID")]
  pub user_id:   String,
  pub symptom:   String,
  pub diagnosis: String,
  pub datetime:  Timestamp,
  #[serde(skip)]
  pub embedding: Vec<f32>,
}

impl MedicalRecord {
  pub fn from_new(new: NewMedicalRecord, embedding: Vec<f32>) -> Self {
    Self {
      user_id: new.user_id,
      symptom: new.symptom,
      diagnosis: new.diagnosis,
      datetime: new.datetime,
      embedding,
    }
  }
}

/// A medical record paired with its similarity to a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
  pub record: MedicalRecord,
  /// Dot product of the (unit) record and query embeddings.
  pub score:  f32,
}

// ─── Flat records ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VitalsRecord {
  #[serde(rename = "User_ID")]
  pub user_id:        String,
  /// Degrees Celsius.
  pub temperature:    f64,
  /// Free-form reading, e.g. `120/80`.
  pub blood_pressure: String,
  /// Beats per minute.
  pub pulse_rate:     f64,
  pub datetime:       Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivityRecord {
  #[serde(rename = "User_ID")]
  pub user_id:  String,
  pub activity: String,
  /// Minutes.
  pub duration: f64,
  pub datetime: Timestamp,
}

/// A summary of an earlier chat exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PromptRecord {
  #[serde(rename = "User_ID")]
  pub user_id:  String,
  pub summary:  String,
  pub datetime: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DietRecord {
  #[serde(rename = "User_ID")]
  pub user_id:  String,
  pub meal:     String,
  pub calories: f64,
  pub datetime: Timestamp,
}

// ─── Heterogeneous rows ──────────────────────────────────────────────────────

/// One row from any record table, as returned by
/// [`RecordStore::query_by_user`](crate::store::RecordStore::query_by_user).
///
/// Serialises untagged, i.e. exactly as the wrapped record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserRecord {
  Medical(MedicalRecord),
  Vitals(VitalsRecord),
  Activity(ActivityRecord),
  Prompt(PromptRecord),
  Diet(DietRecord),
}

impl UserRecord {
  pub fn table(&self) -> Table {
    match self {
      UserRecord::Medical(_) => Table::Medical,
      UserRecord::Vitals(_) => Table::Vitals,
      UserRecord::Activity(_) => Table::Activity,
      UserRecord::Prompt(_) => Table::Prompts,
      UserRecord::Diet(_) => Table::Diet,
    }
  }

  pub fn user_id(&self) -> &str {
    match self {
      UserRecord::Medical(r) => &r.user_id,
      UserRecord::Vitals(r) => &r.user_id,
      UserRecord::Activity(r) => &r.user_id,
      UserRecord::Prompt(r) => &r.user_id,
      UserRecord::Diet(r) => &r.user_id,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamp_parses_and_formats_canonically() {
    let ts: Timestamp = "2025-04-01 10:00:00".parse().unwrap();
    assert_eq!(ts.to_string(), "2025-04-01 10:00:00");
  }

  #[test]
  fn timestamp_rejects_other_formats() {
    assert!("2025-04-01T10:00:00Z".parse::<Timestamp>().is_err());
    assert!("01/04/2025".parse::<Timestamp>().is_err());
    assert!("".parse::<Timestamp>().is_err());
  }

  #[test]
  fn timestamp_now_has_no_subseconds() {
    let ts = Timestamp::now();
    let again: Timestamp = ts.to_string().parse().unwrap();
    assert_eq!(ts, again);
  }

  #[test]
  fn embedding_text_joins_with_single_space() {
    let rec = NewMedicalRecord {
      user_id:   "129".into(),
      symptom:   "Diabetes".into(),
      diagnosis: "high blood sugar".into(),
      datetime:  "2025-04-01 10:00:00".parse().unwrap(),
    };
    assert_eq!(rec.embedding_text(), "Diabetes high blood sugar");
  }

  #[test]
  fn vitals_serialise_with_wire_field_names_in_order() {
    let rec = VitalsRecord {
      user_id:        "129".into(),
      temperature:    37.2,
      blood_pressure: "120/80".into(),
      pulse_rate:     72.0,
      datetime:       "2025-03-01 10:05:00".parse().unwrap(),
    };
    let json = serde_json::to_string(&rec).unwrap();
    assert_eq!(
      json,
      r#"{"User_ID":"129","Temperature":37.2,"BloodPressure":"120/80","PulseRate":72.0,"Datetime":"2025-03-01 10:05:00"}"#
    );
  }

  #[test]
  fn medical_record_omits_embedding_on_the_wire() {
    let rec = MedicalRecord {
      user_id:   "129".into(),
      symptom:   "Cough".into(),
      diagnosis: "Common cold".into(),
      datetime:  "2025-03-01 08:40:00".parse().unwrap(),
      embedding: vec![1.0, 0.0],
    };
    let value = serde_json::to_value(UserRecord::Medical(rec)).unwrap();
    assert!(value.get("Embedding").is_none());
    assert_eq!(value["Symptom"], "Cough");
  }
}
