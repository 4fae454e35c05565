use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::applications::service::{
    AnalyzeJobResponse, SavePreferencesResponse, SubmitApplicationResponse, SubmitParams,
};
use crate::autofill::preferences::PreferenceRecord;
use crate::autofill::FieldValues;
use crate::errors::AppError;
use crate::forms::models::FormField;
use crate::models::submission::SubmissionRow;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct AnalyzeJobRequest {
    pub job_url: String,
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct SubmitApplicationRequest {
    pub job_url: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub form_data: Map<String, Value>,
    #[serde(default)]
    pub save_preferences: bool,
    #[serde(default)]
    pub auto_learn: bool,
}

#[derive(Deserialize)]
pub struct MissingFieldsQuery {
    pub user_id: Uuid,
    pub job_url: String,
}

#[derive(Serialize)]
pub struct MissingFieldsResponse {
    pub missing_fields: Vec<FormField>,
    pub count: usize,
}

#[derive(Deserialize)]
pub struct SavePreferencesRequest {
    pub user_id: Uuid,
    pub preferences: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub user_id: Uuid,
    pub limit: Option<i64>,
}

/// Coerces loosely typed JSON form data to string values. Nested objects and
/// arrays of non-scalars are rejected.
pub fn coerce_form_values(raw: &Map<String, Value>) -> Result<FieldValues, AppError> {
    raw.iter()
        .map(|(key, value)| {
            let coerced = scalar_to_string(value).or_else(|| match value {
                Value::Array(items) => items
                    .iter()
                    .map(scalar_to_string)
                    .collect::<Option<Vec<_>>>()
                    .map(|parts| {
                        parts
                            .into_iter()
                            .filter(|p| !p.is_empty())
                            .collect::<Vec<_>>()
                            .join(", ")
                    }),
                _ => None,
            });
            coerced
                .map(|v| (key.clone(), v))
                .ok_or_else(|| AppError::Validation(format!("field '{key}' must be a scalar value")))
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// POST /api/v1/jobs/analyze
pub async fn handle_analyze_job(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeJobRequest>,
) -> Result<Json<AnalyzeJobResponse>, AppError> {
    let response = state.engine.analyze_job(&req.job_url, req.user_id).await?;
    Ok(Json(response))
}

/// POST /api/v1/jobs/submit
pub async fn handle_submit_application(
    State(state): State<AppState>,
    Json(req): Json<SubmitApplicationRequest>,
) -> Result<Json<SubmitApplicationResponse>, AppError> {
    let form_data = coerce_form_values(&req.form_data)?;
    let response = state
        .engine
        .submit_application(SubmitParams {
            job_url: req.job_url,
            user_id: req.user_id,
            form_data,
            save_preferences: req.save_preferences,
            auto_learn: req.auto_learn,
        })
        .await?;
    Ok(Json(response))
}

/// GET /api/v1/jobs/missing-fields
pub async fn handle_missing_fields(
    State(state): State<AppState>,
    Query(params): Query<MissingFieldsQuery>,
) -> Result<Json<MissingFieldsResponse>, AppError> {
    let missing_fields = state
        .engine
        .get_missing_fields(params.user_id, &params.job_url)
        .await?;
    Ok(Json(MissingFieldsResponse {
        count: missing_fields.len(),
        missing_fields,
    }))
}

/// POST /api/v1/preferences
pub async fn handle_save_preferences(
    State(state): State<AppState>,
    Json(req): Json<SavePreferencesRequest>,
) -> Result<Json<SavePreferencesResponse>, AppError> {
    let preferences = coerce_form_values(&req.preferences)?;
    let response = state
        .engine
        .save_preferences(req.user_id, &preferences)
        .await?;
    Ok(Json(response))
}

/// GET /api/v1/preferences
pub async fn handle_get_preferences(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<PreferenceRecord>, AppError> {
    Ok(Json(state.engine.get_preferences(params.user_id).await?))
}

/// GET /api/v1/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<SubmissionRow>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_HISTORY_LIMIT}"
        )));
    }
    let rows = state
        .engine
        .list_applications(params.user_id, limit)
        .await?;
    Ok(Json(rows))
}
