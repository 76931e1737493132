//! Demo data for a single patient.
//!
//! Seeds one diabetes diagnosis, and with `all` also a fortnight of vitals,
//! activity, past conversation summaries and meals.

use carebot_core::{
  Result,
  keeper::RecordKeeper,
  provider::Embedder,
  record::{ActivityRecord, DietRecord, NewMedicalRecord, Timestamp, VitalsRecord},
  store::RecordStore,
};
use serde::Serialize;

const VITALS: &[(f64, &str, f64, &str)] = &[
  (37.2, "120/80", 72.0, "2025-03-01 10:05:00"),
  (37.1, "120/80", 70.0, "2025-03-03 09:20:00"),
  (37.0, "119/78", 74.0, "2025-03-05 10:50:00"),
  (36.9, "117/75", 68.0, "2025-03-07 08:00:00"),
  (37.2, "121/81", 75.0, "2025-03-09 09:00:00"),
];

const ACTIVITY: &[(&str, f64, &str)] = &[
  ("Walking", 45.0, "2025-03-01 07:00:00"),
  ("Cycling", 30.0, "2025-03-02 17:00:00"),
  ("Yoga", 60.0, "2025-03-04 06:30:00"),
  ("Running", 25.0, "2025-03-06 07:15:00"),
  ("Swimming", 40.0, "2025-03-08 08:00:00"),
];

const PROMPTS: &[(&str, &str)] = &[
  ("Asked about common cold symptoms and remedies.", "2025-03-01 08:40:00"),
  ("Inquired about headache management strategies.", "2025-03-03 09:25:00"),
  ("Sought advice on sore throat care.", "2025-03-05 10:55:00"),
  ("Asked about fatigue causes and energy-boosting tips.", "2025-03-07 11:05:00"),
];

const DIET: &[(&str, f64, &str)] = &[
  ("Breakfast", 400.0, "2025-03-01 07:30:00"),
  ("Lunch", 600.0, "2025-03-01 12:30:00"),
  ("Dinner", 800.0, "2025-03-01 19:00:00"),
  ("Snack", 200.0, "2025-03-01 16:00:00"),
  ("Breakfast", 450.0, "2025-03-03 07:45:00"),
  ("Lunch", 650.0, "2025-03-03 12:45:00"),
  ("Dinner", 750.0, "2025-03-03 18:45:00"),
  ("Snack", 220.0, "2025-03-03 15:30:00"),
];

/// Rows written per table.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct Seeded {
  pub medical:  usize,
  pub vitals:   usize,
  pub activity: usize,
  pub prompts:  usize,
  pub diet:     usize,
}

fn at(s: &str) -> Result<Timestamp> { s.parse() }

/// Insert the demo rows for `user_id`.
pub async fn populate<S: RecordStore, E: Embedder>(
  keeper: &RecordKeeper<S, E>,
  user_id: &str,
  all: bool,
) -> Result<Seeded> {
  let mut seeded = Seeded::default();

  keeper
    .insert_medical(NewMedicalRecord {
      user_id:   user_id.to_owned(),
      symptom:   "Diabetes".into(),
      diagnosis: "Patient diagnosed with diabetes. Recommend lifestyle modifications and \
                  medication management. Recognise hypoglycemic symptoms and high blood \
                  sugar levels."
        .into(),
      datetime:  at("2025-04-01 10:00:00")?,
    })
    .await?;
  seeded.medical += 1;

  if !all {
    return Ok(seeded);
  }

  for &(temperature, blood_pressure, pulse_rate, datetime) in VITALS {
    keeper
      .insert_vitals(VitalsRecord {
        user_id: user_id.to_owned(),
        temperature,
        blood_pressure: blood_pressure.into(),
        pulse_rate,
        datetime: at(datetime)?,
      })
      .await?;
    seeded.vitals += 1;
  }

  for &(activity, duration, datetime) in ACTIVITY {
    keeper
      .insert_activity(ActivityRecord {
        user_id: user_id.to_owned(),
        activity: activity.into(),
        duration,
        datetime: at(datetime)?,
      })
      .await?;
    seeded.activity += 1;
  }

  for &(summary, datetime) in PROMPTS {
    keeper.insert_prompt(user_id, summary, Some(at(datetime)?)).await?;
    seeded.prompts += 1;
  }

  for &(meal, calories, datetime) in DIET {
    keeper
      .insert_diet(DietRecord {
        user_id: user_id.to_owned(),
        meal: meal.into(),
        calories,
        datetime: at(datetime)?,
      })
      .await?;
    seeded.diet += 1;
  }

  tracing::info!(user = user_id, ?seeded, "populated demo records");
  Ok(seeded)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use carebot_core::{record::Table, retry::RetryPolicy, store::memory::MemoryStore};
  use carebot_providers::HashEmbedder;

  use super::*;

  fn keeper() -> RecordKeeper<MemoryStore, HashEmbedder> {
    RecordKeeper::new(
      Arc::new(MemoryStore::new(64)),
      Arc::new(HashEmbedder::new(64)),
      RetryPolicy::default(),
    )
    .unwrap()
  }

  #[tokio::test]
  async fn medical_only_by_default() {
    let k = keeper();
    let seeded = populate(&k, "129", false).await.unwrap();
    assert_eq!(seeded, Seeded { medical: 1, ..Default::default() });
    assert!(k.query_by_user(Table::Vitals, "129").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn all_fills_every_table() {
    let k = keeper();
    let seeded = populate(&k, "129", true).await.unwrap();
    assert_eq!(seeded, Seeded { medical: 1, vitals: 5, activity: 5, prompts: 4, diet: 8 });

    for (table, n) in [
      (Table::Medical, 1),
      (Table::Vitals, 5),
      (Table::Activity, 5),
      (Table::Prompts, 4),
      (Table::Diet, 8),
    ] {
      assert_eq!(k.query_by_user(table, "129").await.unwrap().len(), n);
    }
    assert!(k.query_by_user(Table::Diet, "130").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn seeded_diagnosis_is_retrievable() {
    let k = keeper();
    populate(&k, "129", false).await.unwrap();
    let hits = k.retrieve_similar("129", "blood sugar", 3).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].symptom, "Diabetes");
  }
}
