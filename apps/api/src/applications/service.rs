//! The engine behind the four public operations: analyze a job, submit an
//! application, list missing fields, save preferences.
//!
//! Responses are additive: when a later stage fails, whatever earlier stages
//! produced is still returned alongside the error.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::autofill::learning::{completion_rate, LearningLoop};
use crate::autofill::matcher::{AutoFillMatcher, FillResult};
use crate::autofill::planner::{ApplicationParams, SubmissionPlanner};
use crate::autofill::preferences::{PreferenceRecord, PreferenceStore};
use crate::autofill::profile::{ProfileProvider, UserProfile};
use crate::autofill::FieldValues;
use crate::errors::AppError;
use crate::forms::cache::SchemaCache;
use crate::forms::document::RawDocument;
use crate::forms::extractor::{ExtractionError, FormSchemaExtractor};
use crate::forms::models::{FormField, FormSchema};
use crate::forms::normalize::SynonymTable;
use crate::jobs::{JobParser, JobPosting};
use crate::models::submission::SubmissionRow;
use crate::platform::{PlatformClassifier, PlatformInfo};
use crate::submission::history::{HistoryParams, SubmissionHistory};
use crate::submission::orchestrator::{SubmissionOrchestrator, SubmissionResult};

// ────────────────────────────────────────────────────────────────────────────
// Operation inputs and outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeJobResponse {
    pub success: bool,
    pub platform: PlatformInfo,
    pub job_details: Option<JobPosting>,
    pub form_schema: Option<FormSchema>,
    pub auto_filled_data: FieldValues,
    pub missing_fields: Vec<String>,
    pub can_auto_submit: bool,
    pub error: Option<String>,
}

impl AnalyzeJobResponse {
    fn partial(platform: PlatformInfo, job_details: Option<JobPosting>, error: String) -> Self {
        Self {
            success: false,
            platform,
            job_details,
            form_schema: None,
            auto_filled_data: FieldValues::new(),
            missing_fields: Vec::new(),
            can_auto_submit: false,
            error: Some(error),
        }
    }
}

pub struct SubmitParams {
    pub job_url: String,
    pub user_id: Uuid,
    pub form_data: FieldValues,
    pub save_preferences: bool,
    pub auto_learn: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextApplicationHint {
    pub saved_preferences: usize,
    pub last_success_rate: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitApplicationResponse {
    pub success: bool,
    pub application_id: Option<String>,
    pub result: SubmissionResult,
    pub learned_fields: usize,
    pub success_rate: f64,
    pub next_application_hint: Option<NextApplicationHint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePreferencesResponse {
    pub saved_fields: usize,
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Collaborators the engine is assembled from.
pub struct EngineDeps {
    pub extractor: FormSchemaExtractor,
    pub job_parser: Arc<dyn JobParser>,
    pub cache: SchemaCache,
    pub profiles: Arc<dyn ProfileProvider>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub history: Arc<dyn SubmissionHistory>,
    pub orchestrator: SubmissionOrchestrator,
    pub synonyms: Arc<SynonymTable>,
    pub analyze_timeout: Duration,
    pub submit_timeout: Duration,
}

pub struct ApplicationEngine {
    classifier: PlatformClassifier,
    extractor: FormSchemaExtractor,
    job_parser: Arc<dyn JobParser>,
    cache: SchemaCache,
    profiles: Arc<dyn ProfileProvider>,
    preferences: Arc<dyn PreferenceStore>,
    history: Arc<dyn SubmissionHistory>,
    orchestrator: SubmissionOrchestrator,
    matcher: AutoFillMatcher,
    planner: SubmissionPlanner,
    learning: LearningLoop,
    analyze_timeout: Duration,
    submit_timeout: Duration,
}

impl ApplicationEngine {
    pub fn new(deps: EngineDeps) -> Self {
        let EngineDeps {
            extractor,
            job_parser,
            cache,
            profiles,
            preferences,
            history,
            orchestrator,
            synonyms,
            analyze_timeout,
            submit_timeout,
        } = deps;

        Self {
            classifier: PlatformClassifier,
            extractor,
            job_parser,
            cache,
            profiles,
            planner: SubmissionPlanner::new(synonyms.clone()),
            learning: LearningLoop::new(preferences.clone(), synonyms),
            preferences,
            history,
            orchestrator,
            matcher: AutoFillMatcher,
            analyze_timeout,
            submit_timeout,
        }
    }

    /// Read-only; safe to retry.
    pub async fn analyze_job(
        &self,
        job_url: &str,
        user_id: Uuid,
    ) -> Result<AnalyzeJobResponse, AppError> {
        let platform = self.classifier.classify(job_url)?;
        let deadline = deadline_after(self.analyze_timeout);

        let document = self.extractor.fetch_document(job_url, deadline).await;
        let job = document.as_ref().ok().and_then(|doc| self.parse_job(doc, &platform));

        let schema = match self.schema_for(job_url, &platform, document).await {
            Ok(schema) => schema,
            Err(e) => {
                warn!(
                    "Form extraction failed for {job_url} (transient: {}): {e}",
                    e.is_transient()
                );
                return Ok(AnalyzeJobResponse::partial(
                    platform,
                    job,
                    format!("Failed to extract form fields: {e}"),
                ));
            }
        };

        let (profile, preferences) = match self.load_sources(user_id).await {
            Ok(sources) => sources,
            Err(e) => {
                let mut response = AnalyzeJobResponse::partial(
                    platform,
                    job,
                    format!("Failed to load saved answers: {e}"),
                );
                response.missing_fields = schema.fields().iter().map(|f| f.name.clone()).collect();
                response.form_schema = Some(schema);
                return Ok(response);
            }
        };

        let fill = self.matcher.fill(&schema, &profile, &preferences);
        let decision = self.planner.decide(&schema, &fill);
        info!(
            "Analyzed {job_url} on {}: {} filled, {} missing, auto-submit={}",
            platform.name,
            fill.filled_count(),
            fill.missing_fields.len(),
            decision.can_auto_submit
        );

        let FillResult {
            auto_filled_data,
            missing_fields,
        } = fill;
        Ok(AnalyzeJobResponse {
            success: true,
            platform,
            job_details: job,
            form_schema: Some(schema),
            auto_filled_data,
            missing_fields,
            can_auto_submit: decision.can_auto_submit,
            error: None,
        })
    }

    /// Submits, then learns from the submitted values. Learning and history
    /// are best-effort and never fail the submission.
    pub async fn submit_application(
        &self,
        params: SubmitParams,
    ) -> Result<SubmitApplicationResponse, AppError> {
        let SubmitParams {
            job_url,
            user_id,
            form_data,
            save_preferences,
            auto_learn,
        } = params;

        let platform = self.classifier.classify(&job_url)?;
        let deadline = deadline_after(self.submit_timeout);

        let fetch_deadline = deadline_after(self.analyze_timeout).min(deadline);
        let job = match self.extractor.fetch_document(&job_url, fetch_deadline).await {
            Ok(doc) => self.parse_job(&doc, &platform),
            Err(e) => {
                warn!("Submitting without job details for {job_url}: {e}");
                None
            }
        };

        let application = self.planner.assemble(ApplicationParams {
            job_url: &job_url,
            platform: &platform,
            job: job.as_ref(),
            user_id,
            form_values: &form_data,
        });
        let result = self.orchestrator.submit(&application, deadline).await?;
        let success_rate = completion_rate(&form_data);

        let learned_fields = if (save_preferences || auto_learn) && result.is_complete() {
            match self.learning.learn(user_id, &form_data).await {
                Ok(learned) => learned,
                Err(e) => {
                    warn!("Learning failed for user {user_id}: {e}");
                    0
                }
            }
        } else {
            0
        };

        let row = SubmissionRow::from_outcome(HistoryParams {
            user_id,
            job_url: &job_url,
            platform: &platform,
            job: job.as_ref(),
            result: &result,
            success_rate,
            fields_submitted: form_data.len(),
        });
        if let Err(e) = self.history.record(&row).await {
            warn!("Failed to record submission history for user {user_id}: {e}");
        }

        let next_application_hint = if auto_learn {
            Some(self.next_application_hint(user_id, learned_fields, success_rate).await)
        } else {
            None
        };

        Ok(SubmitApplicationResponse {
            success: result.success,
            application_id: result.application_id.clone(),
            result,
            learned_fields,
            success_rate,
            next_application_hint,
        })
    }

    /// Every field the user's profile and saved answers cannot fill.
    pub async fn get_missing_fields(
        &self,
        user_id: Uuid,
        job_url: &str,
    ) -> Result<Vec<FormField>, AppError> {
        let platform = self.classifier.classify(job_url)?;
        let deadline = deadline_after(self.analyze_timeout);

        let schema = match self.cache.get(platform.id, job_url).await {
            Some(schema) => schema,
            None => {
                let document = self.extractor.fetch_document(job_url, deadline).await?;
                self.extract_and_cache(job_url, &document, &platform).await?
            }
        };

        let (profile, preferences) = self.load_sources(user_id).await?;
        let fill = self.matcher.fill(&schema, &profile, &preferences);

        Ok(fill
            .missing_fields
            .iter()
            .filter_map(|name| schema.field(name).cloned())
            .collect())
    }

    /// Idempotent upsert of user-supplied answers.
    pub async fn save_preferences(
        &self,
        user_id: Uuid,
        preferences: &FieldValues,
    ) -> Result<SavePreferencesResponse, AppError> {
        let saved_fields = self.learning.learn(user_id, preferences).await?;
        Ok(SavePreferencesResponse {
            saved_fields,
            message: format!("Saved {saved_fields} preferences for future applications"),
        })
    }

    pub async fn get_preferences(&self, user_id: Uuid) -> Result<PreferenceRecord, AppError> {
        Ok(self.preferences.get(user_id).await?)
    }

    pub async fn list_applications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SubmissionRow>, AppError> {
        Ok(self.history.list(user_id, limit).await?)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Helpers
    // ────────────────────────────────────────────────────────────────────────

    fn parse_job(&self, document: &RawDocument, platform: &PlatformInfo) -> Option<JobPosting> {
        match self.job_parser.parse(document, platform) {
            Ok(job) => Some(job),
            Err(e) => {
                warn!("Job metadata unavailable for {}: {e}", document.url);
                None
            }
        }
    }

    /// Cached schema if present, else extracted from the fetched document.
    /// A cached schema also covers a failed fetch.
    async fn schema_for(
        &self,
        job_url: &str,
        platform: &PlatformInfo,
        document: Result<RawDocument, ExtractionError>,
    ) -> Result<FormSchema, ExtractionError> {
        if let Some(schema) = self.cache.get(platform.id, job_url).await {
            return Ok(schema);
        }
        self.extract_and_cache(job_url, &document?, platform).await
    }

    async fn extract_and_cache(
        &self,
        job_url: &str,
        document: &RawDocument,
        platform: &PlatformInfo,
    ) -> Result<FormSchema, ExtractionError> {
        let schema = self.extractor.extract_document(document, platform)?;
        self.cache.put(job_url, &schema).await;
        Ok(schema)
    }

    async fn load_sources(&self, user_id: Uuid) -> Result<(UserProfile, PreferenceRecord), AppError> {
        let profile = match self.profiles.get_profile(user_id).await? {
            Some(profile) => profile,
            None => {
                warn!("No profile for user {user_id}; matching on saved answers only");
                UserProfile::default()
            }
        };
        let preferences = self.preferences.get(user_id).await?;
        Ok((profile, preferences))
    }

    async fn next_application_hint(
        &self,
        user_id: Uuid,
        learned_fields: usize,
        success_rate: f64,
    ) -> NextApplicationHint {
        let saved_preferences = match self.preferences.get(user_id).await {
            Ok(record) => record.len(),
            Err(e) => {
                warn!("Could not count saved preferences for user {user_id}: {e}");
                learned_fields
            }
        };
        NextApplicationHint {
            saved_preferences,
            last_success_rate: success_rate,
            message: format!(
                "{saved_preferences} saved answers will be reused on your next application"
            ),
        }
    }
}

/// `now + budget`, saturating at a year out instead of overflowing.
fn deadline_after(budget: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(budget)
        .unwrap_or_else(|| now + Duration::from_secs(365 * 24 * 60 * 60))
}
