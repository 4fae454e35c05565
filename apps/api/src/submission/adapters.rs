//! Submission adapters: HTTP form post and manual handoff.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::autofill::planner::ApplicationData;
use crate::submission::orchestrator::{
    SubmissionAdapter, SubmissionError, SubmissionResult, SubmissionStatus,
};

const USER_AGENT: &str = concat!("formpilot/", env!("CARGO_PKG_VERSION"));

/// Prepares the data and leaves the final click to the user.
#[derive(Debug, Clone, Default)]
pub struct ManualHandoffAdapter;

#[async_trait]
impl SubmissionAdapter for ManualHandoffAdapter {
    fn method(&self) -> &'static str {
        "manual"
    }

    async fn submit(
        &self,
        application: &ApplicationData,
    ) -> Result<SubmissionResult, SubmissionError> {
        Ok(SubmissionResult {
            success: false,
            application_id: None,
            status: SubmissionStatus::RequiresManual,
            platform: application.platform.name.clone(),
            submission_method: self.method().to_string(),
            message: "This platform requires manual application. Your answers are prepared for copy-paste.".to_string(),
            diagnostics: vec!["unsupported_platform".to_string()],
            next_steps: vec![
                "Open the job posting in a new tab".to_string(),
                "Use the pre-filled data to complete the application".to_string(),
                "Upload your resume and cover letter".to_string(),
            ],
            requires_manual: true,
            tracking_url: Some(application.job_url.clone()),
            submitted_at: None,
        })
    }
}

/// Posts the values form-encoded to the form action.
#[derive(Clone)]
pub struct HttpFormAdapter {
    client: Client,
}

impl HttpFormAdapter {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()?,
        })
    }
}

/// Maps a non-success HTTP status onto the retry classification.
pub fn status_error(status: StatusCode) -> Option<SubmissionError> {
    if status.is_success() || status.is_redirection() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        Some(SubmissionError::Transient(format!("platform returned {status}")))
    } else {
        Some(SubmissionError::Permanent(format!("platform returned {status}")))
    }
}

#[async_trait]
impl SubmissionAdapter for HttpFormAdapter {
    fn method(&self) -> &'static str {
        "http_form"
    }

    async fn submit(
        &self,
        application: &ApplicationData,
    ) -> Result<SubmissionResult, SubmissionError> {
        let target = application.target_url();
        debug!("Posting {} fields to {target}", application.values.len());

        let response = self
            .client
            .post(target)
            .form(&application.values)
            .send()
            .await
            .map_err(|e| {
                warn!("Form post to {target} failed: {e}");
                SubmissionError::Transient(e.to_string())
            })?;

        if let Some(err) = status_error(response.status()) {
            warn!("Form post to {target} was refused: {err}");
            return Err(err);
        }

        Ok(SubmissionResult {
            success: true,
            application_id: Some(format!("app_{}", Uuid::new_v4().simple())),
            status: SubmissionStatus::Submitted,
            platform: application.platform.name.clone(),
            submission_method: self.method().to_string(),
            message: format!(
                "Application submitted successfully via {}",
                application.platform.name
            ),
            diagnostics: Vec::new(),
            next_steps: vec![
                "Check your email for confirmation".to_string(),
                "Monitor application status on the company portal".to_string(),
            ],
            requires_manual: false,
            tracking_url: Some(response.url().to_string()),
            submitted_at: Some(Utc::now()),
        })
    }
}
