//! Submission history, recorded after every completed submission.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::autofill::preferences::StoreError;
use crate::jobs::JobPosting;
use crate::models::submission::SubmissionRow;
use crate::platform::PlatformInfo;
use crate::submission::orchestrator::SubmissionResult;

#[async_trait]
pub trait SubmissionHistory: Send + Sync {
    async fn record(&self, row: &SubmissionRow) -> Result<(), StoreError>;

    /// Most recent first.
    async fn list(&self, user_id: Uuid, limit: i64) -> Result<Vec<SubmissionRow>, StoreError>;
}

/// Outcome of one submission, ready to be recorded.
pub struct HistoryParams<'a> {
    pub user_id: Uuid,
    pub job_url: &'a str,
    pub platform: &'a PlatformInfo,
    pub job: Option<&'a JobPosting>,
    pub result: &'a SubmissionResult,
    pub success_rate: f64,
    pub fields_submitted: usize,
}

impl SubmissionRow {
    pub fn from_outcome(params: HistoryParams<'_>) -> Self {
        let HistoryParams {
            user_id,
            job_url,
            platform,
            job,
            result,
            success_rate,
            fields_submitted,
        } = params;

        Self {
            id: Uuid::new_v4(),
            user_id,
            job_url: job_url.to_string(),
            platform: platform.id.as_str().to_string(),
            job_title: job.map(|j| j.title.clone()),
            company: job.map(|j| j.company.clone()),
            application_id: result.application_id.clone(),
            success: result.success,
            status: result.status.as_str().to_string(),
            success_rate,
            fields_submitted: i32::try_from(fields_submitted).unwrap_or(i32::MAX),
            diagnostics: (!result.diagnostics.is_empty()).then(|| result.diagnostics.join("; ")),
            submitted_at: result.submitted_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Clone)]
pub struct PgSubmissionHistory {
    pool: PgPool,
}

impl PgSubmissionHistory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionHistory for PgSubmissionHistory {
    async fn record(&self, row: &SubmissionRow) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO application_submissions
                (id, user_id, job_url, platform, job_title, company, application_id,
                 success, status, success_rate, fields_submitted, diagnostics, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(&row.job_url)
        .bind(&row.platform)
        .bind(&row.job_title)
        .bind(&row.company)
        .bind(&row.application_id)
        .bind(row.success)
        .bind(&row.status)
        .bind(row.success_rate)
        .bind(row.fields_submitted)
        .bind(&row.diagnostics)
        .bind(row.submitted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, user_id: Uuid, limit: i64) -> Result<Vec<SubmissionRow>, StoreError> {
        Ok(sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT * FROM application_submissions
            WHERE user_id = $1
            ORDER BY submitted_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}
