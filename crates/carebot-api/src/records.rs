//! Handlers for record inserts and queries.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/insert/medical` | `{User_ID, Symptom, Diagnosis, Datetime}` |
//! | `POST` | `/insert/vitals` | `{User_ID, Temperature, BloodPressure, PulseRate, Datetime}` |
//! | `POST` | `/insert/activity` | `{User_ID, Activity, Duration, Datetime}` |
//! | `POST` | `/insert/prompt` | `{User_ID, Summary}`, `Datetime` optional |
//! | `POST` | `/insert/diet` | `{User_ID, Meal, Calories, Datetime}` |
//! | `GET`  | `/medical?user=&prompt=` | Top 3 similar records |
//! | `GET`  | `/vitals?user=` and `/activity`, `/prompts`, `/diet` | Rows in insertion order |

use axum::{
  Json,
  extract::{
    Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
};
use carebot_core::{
  provider::{ChatProvider, Embedder},
  record::{
    ActivityRecord, DietRecord, NewMedicalRecord, Table, Timestamp, UserRecord,
    VitalsRecord,
  },
  store::RecordStore,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{Shared, error::ApiError};

/// Records returned by `GET /medical`.
const MEDICAL_TOP_K: usize = 3;

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
  value.ok_or_else(|| ApiError::BadRequest(format!("Missing field {field}")))
}

fn datetime(value: Option<String>) -> Result<Timestamp, ApiError> {
  Ok(required(value, "Datetime")?.parse()?)
}

fn success() -> Json<Value> { Json(json!({ "status": "success" })) }

// ─── Inserts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MedicalBody {
  #[serde(rename = "User_ID")]
  pub user_id:   Option<String>,
  pub symptom:   Option<String>,
  pub diagnosis: Option<String>,
  pub datetime:  Option<String>,
}

/// `POST /insert/medical`; the embedding is computed server-side.
pub async fn insert_medical<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  body: Result<Json<MedicalBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  let Json(body) = body?;
  let record = NewMedicalRecord {
    user_id:   required(body.user_id, "User_ID")?,
    symptom:   required(body.symptom, "Symptom")?,
    diagnosis: required(body.diagnosis, "Diagnosis")?,
    datetime:  datetime(body.datetime)?,
  };
  chat.keeper().insert_medical(record).await?;
  Ok(success())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VitalsBody {
  #[serde(rename = "User_ID")]
  pub user_id:        Option<String>,
  pub temperature:    Option<f64>,
  pub blood_pressure: Option<String>,
  pub pulse_rate:     Option<f64>,
  pub datetime:       Option<String>,
}

pub async fn insert_vitals<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  body: Result<Json<VitalsBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  let Json(body) = body?;
  let record = VitalsRecord {
    user_id:        required(body.user_id, "User_ID")?,
    temperature:    required(body.temperature, "Temperature")?,
    blood_pressure: required(body.blood_pressure, "BloodPressure")?,
    pulse_rate:     required(body.pulse_rate, "PulseRate")?,
    datetime:       datetime(body.datetime)?,
  };
  chat.keeper().insert_vitals(record).await?;
  Ok(success())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivityBody {
  #[serde(rename = "User_ID")]
  pub user_id:  Option<String>,
  pub activity: Option<String>,
  pub duration: Option<f64>,
  pub datetime: Option<String>,
}

pub async fn insert_activity<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  body: Result<Json<ActivityBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  let Json(body) = body?;
  let record = ActivityRecord {
    user_id:  required(body.user_id, "User_ID")?,
    activity: required(body.activity, "Activity")?,
    duration: required(body.duration, "Duration")?,
    datetime: datetime(body.datetime)?,
  };
  chat.keeper().insert_activity(record).await?;
  Ok(success())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PromptBody {
  #[serde(rename = "User_ID")]
  pub user_id:  Option<String>,
  pub summary:  Option<String>,
  /// Stamped with the current local time when absent.
  pub datetime: Option<String>,
}

pub async fn insert_prompt<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  body: Result<Json<PromptBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  let Json(body) = body?;
  let user_id = required(body.user_id, "User_ID")?;
  let summary = required(body.summary, "Summary")?;
  let at = body.datetime.map(|s| s.parse::<Timestamp>()).transpose()?;
  chat.keeper().insert_prompt(&user_id, &summary, at).await?;
  Ok(success())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DietBody {
  #[serde(rename = "User_ID")]
  pub user_id:  Option<String>,
  pub meal:     Option<String>,
  pub calories: Option<f64>,
  pub datetime: Option<String>,
}

pub async fn insert_diet<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  body: Result<Json<DietBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  let Json(body) = body?;
  let record = DietRecord {
    user_id:  required(body.user_id, "User_ID")?,
    meal:     required(body.meal, "Meal")?,
    calories: required(body.calories, "Calories")?,
    datetime: datetime(body.datetime)?,
  };
  chat.keeper().insert_diet(record).await?;
  Ok(success())
}

// ─── Similar medical records ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MedicalParams {
  pub user:   Option<String>,
  pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MedicalHit {
  pub symptom:   String,
  pub diagnosis: String,
  pub datetime:  Timestamp,
}

/// `GET /medical?user=<id>&prompt=<text>`
pub async fn similar_medical<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  params: Result<Query<MedicalParams>, QueryRejection>,
) -> Result<Json<Vec<MedicalHit>>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  let Query(params) = params?;
  let (Some(user), Some(prompt)) = (
    params.user.filter(|u| !u.is_empty()),
    params.prompt.filter(|p| !p.is_empty()),
  ) else {
    return Err(ApiError::BadRequest(
      "Missing query parameters 'user' and/or 'prompt'.".into(),
    ));
  };

  let hits = chat
    .keeper()
    .retrieve_similar(&user, &prompt, MEDICAL_TOP_K)
    .await?
    .into_iter()
    .map(|r| MedicalHit { symptom: r.symptom, diagnosis: r.diagnosis, datetime: r.datetime })
    .collect();
  Ok(Json(hits))
}

// ─── Per-user listings ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserParams {
  pub user: Option<String>,
}

async fn list<S, E, C>(
  chat: &Shared<S, E, C>,
  params: Result<Query<UserParams>, QueryRejection>,
  table: Table,
) -> Result<Json<Vec<UserRecord>>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  let Query(params) = params?;
  let user = params
    .user
    .filter(|u| !u.is_empty())
    .ok_or_else(|| ApiError::BadRequest("Missing query parameter 'user'.".into()))?;
  Ok(Json(chat.keeper().query_by_user(table, &user).await?))
}

/// `GET /vitals?user=<id>`
pub async fn list_vitals<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  params: Result<Query<UserParams>, QueryRejection>,
) -> Result<Json<Vec<UserRecord>>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  list(&chat, params, Table::Vitals).await
}

/// `GET /activity?user=<id>`
pub async fn list_activity<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  params: Result<Query<UserParams>, QueryRejection>,
) -> Result<Json<Vec<UserRecord>>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  list(&chat, params, Table::Activity).await
}

/// `GET /prompts?user=<id>`
pub async fn list_prompts<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  params: Result<Query<UserParams>, QueryRejection>,
) -> Result<Json<Vec<UserRecord>>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  list(&chat, params, Table::Prompts).await
}

/// `GET /diet?user=<id>`
pub async fn list_diet<S, E, C>(
  State(chat): State<Shared<S, E, C>>,
  params: Result<Query<UserParams>, QueryRejection>,
) -> Result<Json<Vec<UserRecord>>, ApiError>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  list(&chat, params, Table::Diet).await
}
