use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row of submission history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SubmissionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_url: String,
    pub platform: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub application_id: Option<String>,
    pub success: bool,
    pub status: String,
    pub success_rate: f64,
    pub fields_submitted: i32,
    pub diagnostics: Option<String>,
    pub submitted_at: DateTime<Utc>,
}
