//! Submission Orchestrator: validates the payload, picks an adapter for the
//! platform, and bounds the attempt by the caller's deadline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use crate::autofill::planner::ApplicationData;
use crate::platform::PlatformKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    RequiresManual,
    ValidationFailed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::RequiresManual => "requires_manual",
            SubmissionStatus::ValidationFailed => "validation_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,
    pub application_id: Option<String>,
    pub status: SubmissionStatus,
    pub platform: String,
    pub submission_method: String,
    pub message: String,
    pub diagnostics: Vec<String>,
    pub next_steps: Vec<String>,
    pub requires_manual: bool,
    pub tracking_url: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl SubmissionResult {
    pub fn validation_failed(platform: &str, reason: &str) -> Self {
        Self {
            success: false,
            application_id: None,
            status: SubmissionStatus::ValidationFailed,
            platform: platform.to_string(),
            submission_method: "none".to_string(),
            message: format!("Validation failed: {reason}"),
            diagnostics: vec![reason.to_string()],
            next_steps: Vec::new(),
            requires_manual: false,
            tracking_url: None,
            submitted_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status != SubmissionStatus::ValidationFailed
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubmissionError {
    /// Network failure or elapsed deadline. Safe to retry with backoff.
    #[error("submission failed transiently: {0}")]
    Transient(String),

    /// The platform rejected the application. Not retried.
    #[error("submission rejected: {0}")]
    Permanent(String),
}

impl SubmissionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmissionError::Transient(_))
    }
}

/// Platform-specific submission mechanism.
#[async_trait]
pub trait SubmissionAdapter: Send + Sync {
    fn method(&self) -> &'static str;

    async fn submit(&self, application: &ApplicationData)
        -> Result<SubmissionResult, SubmissionError>;
}

pub struct SubmissionOrchestrator {
    adapters: HashMap<PlatformKind, Arc<dyn SubmissionAdapter>>,
    fallback: Arc<dyn SubmissionAdapter>,
}

impl SubmissionOrchestrator {
    pub fn new(fallback: Arc<dyn SubmissionAdapter>) -> Self {
        Self {
            adapters: HashMap::new(),
            fallback,
        }
    }

    pub fn register(&mut self, kind: PlatformKind, adapter: Arc<dyn SubmissionAdapter>) {
        self.adapters.insert(kind, adapter);
    }

    fn adapter_for(&self, application: &ApplicationData) -> &Arc<dyn SubmissionAdapter> {
        if !application.platform.supports_auto {
            return &self.fallback;
        }
        self.adapters
            .get(&application.platform.kind)
            .unwrap_or(&self.fallback)
    }

    pub async fn submit(
        &self,
        application: &ApplicationData,
        deadline: Instant,
    ) -> Result<SubmissionResult, SubmissionError> {
        if application.email().is_none() {
            warn!(
                "Rejecting application for {} without an email address",
                application.job_url
            );
            return Ok(SubmissionResult::validation_failed(
                &application.platform.name,
                "email is required",
            ));
        }

        let adapter = self.adapter_for(application);
        info!(
            "Submitting application to {} via {}",
            application.platform.name,
            adapter.method()
        );

        match timeout_at(deadline, adapter.submit(application)).await {
            Ok(result) => result,
            Err(_) => Err(SubmissionError::Transient(format!(
                "deadline elapsed before {} answered",
                application.platform.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::autofill::FieldValues;
    use crate::platform::{PlatformClassifier, PlatformInfo};
    use crate::submission::adapters::ManualHandoffAdapter;
    use crate::testing::ScriptedAdapter;

    fn application(url: &str, email: Option<&str>) -> ApplicationData {
        let platform: PlatformInfo = PlatformClassifier.classify(url).unwrap();
        let mut canonical = FieldValues::new();
        if let Some(email) = email {
            canonical.insert("email".to_string(), email.to_string());
        }
        ApplicationData {
            job_url: url.to_string(),
            platform,
            job: None,
            user_id: Uuid::new_v4(),
            values: canonical.clone(),
            canonical,
        }
    }

    fn orchestrator(adapter: Arc<ScriptedAdapter>) -> SubmissionOrchestrator {
        let mut orchestrator = SubmissionOrchestrator::new(Arc::new(ManualHandoffAdapter));
        orchestrator.register(PlatformKind::CompanyAts, adapter);
        orchestrator
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(120)
    }

    #[tokio::test]
    async fn test_missing_email_is_a_validation_result() {
        let adapter = Arc::new(ScriptedAdapter::succeeding());
        let result = orchestrator(adapter.clone())
            .submit(&application("https://jobs.lever.co/acme/1", None), far_deadline())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.status, SubmissionStatus::ValidationFailed);
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_routes_by_platform_kind() {
        let adapter = Arc::new(ScriptedAdapter::succeeding());
        let result = orchestrator(adapter.clone())
            .submit(
                &application("https://jobs.lever.co/acme/1", Some("a@b.com")),
                far_deadline(),
            )
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_platform_is_handed_off() {
        let adapter = Arc::new(ScriptedAdapter::succeeding());
        let result = orchestrator(adapter.clone())
            .submit(
                &application("https://acme.com/careers/1", Some("a@b.com")),
                far_deadline(),
            )
            .await
            .unwrap();
        assert!(result.requires_manual);
        assert_eq!(result.status, SubmissionStatus::RequiresManual);
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_adapter_errors_keep_their_class() {
        let adapter = Arc::new(ScriptedAdapter::failing(SubmissionError::Permanent(
            "422 Unprocessable Entity".to_string(),
        )));
        let err = orchestrator(adapter)
            .submit(
                &application("https://jobs.lever.co/acme/1", Some("a@b.com")),
                far_deadline(),
            )
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_deadline_is_transient() {
        let adapter = Arc::new(ScriptedAdapter::succeeding().with_delay(Duration::from_secs(600)));
        let deadline = Instant::now() + Duration::from_secs(120);
        let err = orchestrator(adapter)
            .submit(
                &application("https://jobs.lever.co/acme/1", Some("a@b.com")),
                deadline,
            )
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, SubmissionError::Transient(_)));
    }
}
