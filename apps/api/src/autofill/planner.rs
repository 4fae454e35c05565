//! Submission Planner: the auto-submit decision and the final payload.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::autofill::matcher::FillResult;
use crate::autofill::FieldValues;
use crate::forms::models::FormSchema;
use crate::forms::normalize::SynonymTable;
use crate::jobs::JobPosting;
use crate::platform::PlatformInfo;

/// Most optional gaps tolerated before a human has to look at the form.
const MAX_OPTIONAL_GAPS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSubmitDecision {
    pub can_auto_submit: bool,
    pub missing_required: Vec<String>,
}

/// Everything an adapter needs to submit one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationData {
    pub job_url: String,
    pub platform: PlatformInfo,
    pub job: Option<JobPosting>,
    pub user_id: Uuid,
    /// Values under the keys the form uses.
    pub values: FieldValues,
    /// The same values under canonical keys, blanks dropped.
    pub canonical: FieldValues,
}

impl ApplicationData {
    pub fn email(&self) -> Option<&str> {
        self.canonical.get("email").map(String::as_str)
    }

    /// Where the form posts: the declared action, else the job URL itself.
    pub fn target_url(&self) -> &str {
        self.job
            .as_ref()
            .and_then(|j| j.application_url.as_deref())
            .unwrap_or(&self.job_url)
    }
}

/// Inputs for assembling one application payload.
pub struct ApplicationParams<'a> {
    pub job_url: &'a str,
    pub platform: &'a PlatformInfo,
    pub job: Option<&'a JobPosting>,
    pub user_id: Uuid,
    pub form_values: &'a FieldValues,
}

#[derive(Clone)]
pub struct SubmissionPlanner {
    synonyms: Arc<SynonymTable>,
}

impl SubmissionPlanner {
    pub fn new(synonyms: Arc<SynonymTable>) -> Self {
        Self { synonyms }
    }

    /// Auto-submit when nothing is missing, or when at most three fields are
    /// missing and none of them is required.
    pub fn decide(&self, schema: &FormSchema, fill: &FillResult) -> AutoSubmitDecision {
        let missing_required: Vec<String> = fill
            .missing_fields
            .iter()
            .filter(|name| schema.is_required(name))
            .cloned()
            .collect();

        let can_auto_submit = fill.missing_fields.is_empty()
            || (fill.missing_fields.len() <= MAX_OPTIONAL_GAPS && missing_required.is_empty());

        AutoSubmitDecision {
            can_auto_submit,
            missing_required,
        }
    }

    pub fn assemble(&self, params: ApplicationParams<'_>) -> ApplicationData {
        let ApplicationParams {
            job_url,
            platform,
            job,
            user_id,
            form_values,
        } = params;

        let canonical: BTreeMap<String, String> = form_values
            .iter()
            .map(|(k, v)| (self.synonyms.canonicalize(k), v.trim()))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .map(|(k, v)| (k, v.to_string()))
            .collect();

        ApplicationData {
            job_url: job_url.to_string(),
            platform: platform.clone(),
            job: job.cloned(),
            user_id,
            values: form_values.clone(),
            canonical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::models::{FieldType, FormField};
    use crate::platform::PlatformId;

    fn planner() -> SubmissionPlanner {
        SubmissionPlanner::new(Arc::new(SynonymTable::builtin().unwrap()))
    }

    /// Five optional fields plus one required `email`.
    fn schema() -> FormSchema {
        let mut fields = vec![FormField::new("email", "Email", FieldType::Email, true)];
        for name in ["a", "b", "c", "d", "e"] {
            fields.push(FormField::new(name, name, FieldType::Text, false));
        }
        FormSchema::new(PlatformId::Unknown, fields).unwrap()
    }

    fn missing(names: &[&str]) -> FillResult {
        FillResult {
            auto_filled_data: BTreeMap::new(),
            missing_fields: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[test]
    fn test_nothing_missing_allows_auto_submit() {
        assert!(planner().decide(&schema(), &missing(&[])).can_auto_submit);
    }

    #[test]
    fn test_three_optional_gaps_allowed() {
        assert!(planner().decide(&schema(), &missing(&["a", "b", "c"])).can_auto_submit);
    }

    #[test]
    fn test_four_optional_gaps_block() {
        let decision = planner().decide(&schema(), &missing(&["a", "b", "c", "d"]));
        assert!(!decision.can_auto_submit);
        assert!(decision.missing_required.is_empty());
    }

    #[test]
    fn test_any_required_gap_blocks() {
        let decision = planner().decide(&schema(), &missing(&["email"]));
        assert!(!decision.can_auto_submit);
        assert_eq!(decision.missing_required, vec!["email"]);
    }

    #[test]
    fn test_assemble_builds_canonical_view() {
        let values: FieldValues = [
            ("emailAddress", " jo@example.com "),
            ("fname", "Jo"),
            ("cover_letter", ""),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let platform = PlatformInfo::unknown();

        let data = planner().assemble(ApplicationParams {
            job_url: "https://example.org/jobs/1",
            platform: &platform,
            job: None,
            user_id: Uuid::new_v4(),
            form_values: &values,
        });

        assert_eq!(data.email(), Some("jo@example.com"));
        assert_eq!(data.canonical.get("first_name").map(String::as_str), Some("Jo"));
        assert!(!data.canonical.contains_key("cover_letter"));
        assert_eq!(data.values.len(), 3);
        assert_eq!(data.target_url(), "https://example.org/jobs/1");
    }
}
