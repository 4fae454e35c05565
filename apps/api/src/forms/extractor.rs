//! Form Schema Extractor: turns a fetched job page into a `FormSchema`.
//!
//! Strategy selection is keyed by `PlatformId`: registered platforms use their
//! known field taxonomy (plus any extra questions found on the page); everything
//! else goes through the generic element scan.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::forms::document::{ElementTag, PageFetcher, RawDocument, RawElement};
use crate::forms::models::{FieldType, FormField, FormSchema, SchemaError};
use crate::forms::normalize::{normalize_key, SynonymTable};
use crate::forms::templates::{ats_fields, easy_apply_fields, job_board_fields};
use crate::platform::{PlatformId, PlatformInfo};

const SKIPPED_INPUT_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image"];

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("job page unreachable: {0}")]
    Unreachable(String),

    #[error("timed out fetching the job page")]
    Timeout,

    #[error("no recognizable application form at {0}")]
    NoForm(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ExtractionError {
    /// Network-bound failures that a caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractionError::Unreachable(_) | ExtractionError::Timeout)
    }
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(
        &self,
        document: &RawDocument,
        platform: &PlatformInfo,
        synonyms: &SynonymTable,
    ) -> Result<FormSchema, ExtractionError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Generic strategy
// ────────────────────────────────────────────────────────────────────────────

/// Scans every input-like element on the page.
pub struct GenericStrategy;

impl ExtractionStrategy for GenericStrategy {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn extract(
        &self,
        document: &RawDocument,
        platform: &PlatformInfo,
        synonyms: &SynonymTable,
    ) -> Result<FormSchema, ExtractionError> {
        let fields = scan_fields(document, synonyms);
        if fields.is_empty() {
            return Err(ExtractionError::NoForm(document.url.clone()));
        }
        Ok(FormSchema::new(platform.id, fields)?)
    }
}

/// Builds canonical fields from the document's elements, in page order.
/// Radio inputs sharing a name collapse into one select; the first occurrence
/// of a canonical key wins.
pub fn scan_fields(document: &RawDocument, synonyms: &SynonymTable) -> Vec<FormField> {
    let mut fields: Vec<FormField> = Vec::new();
    let mut taken: HashMap<String, usize> = HashMap::new();
    let mut radio_groups: HashMap<String, usize> = HashMap::new();

    for element in &document.elements {
        let input_type = element.input_type.as_deref().unwrap_or("text");
        if element.tag == ElementTag::Input && SKIPPED_INPUT_TYPES.contains(&input_type) {
            continue;
        }
        let Some(raw_name) = element
            .name
            .as_deref()
            .or(element.id.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            continue;
        };

        let is_radio = element.tag == ElementTag::Input && input_type == "radio";
        if is_radio {
            if let Some(&index) = radio_groups.get(raw_name) {
                let group = &mut fields[index];
                if let Some(choice) = radio_choice(element) {
                    if !group.options.contains(&choice) {
                        group.options.push(choice);
                    }
                }
                group.required |= element.required || element.aria_required;
                continue;
            }
        }

        let (label, starred) = if is_radio {
            (group_label(element, raw_name), false)
        } else {
            field_label(element, raw_name)
        };

        let name = canonical_key(raw_name, &label, synonyms);
        if name.is_empty() || taken.contains_key(&name) {
            continue;
        }

        let options = if is_radio {
            radio_choice(element).into_iter().collect()
        } else {
            element.options.clone()
        };

        let index = fields.len();
        if is_radio {
            radio_groups.insert(raw_name.to_string(), index);
        }
        taken.insert(name.clone(), index);
        fields.push(FormField {
            name,
            label,
            field_type: infer_type(element, input_type),
            required: element.required || element.aria_required || starred,
            options,
        });
    }

    fields
}

fn canonical_key(raw_name: &str, label: &str, synonyms: &SynonymTable) -> String {
    synonyms
        .lookup(raw_name)
        .or_else(|| synonyms.lookup(label))
        .map(str::to_string)
        .unwrap_or_else(|| normalize_key(raw_name))
}

fn infer_type(element: &RawElement, input_type: &str) -> FieldType {
    match element.tag {
        ElementTag::Select => FieldType::Select,
        ElementTag::Textarea => FieldType::Textarea,
        ElementTag::Input => match input_type {
            "email" => FieldType::Email,
            "tel" => FieldType::Phone,
            "url" => FieldType::Url,
            "number" | "range" => FieldType::Number,
            "date" | "month" | "datetime-local" => FieldType::Date,
            "file" => FieldType::File,
            "checkbox" => FieldType::Boolean,
            "radio" => FieldType::Select,
            _ => FieldType::Text,
        },
    }
}

/// Display label with the asterisk required-marker stripped.
fn field_label(element: &RawElement, raw_name: &str) -> (String, bool) {
    let candidate = [&element.label, &element.aria_label, &element.placeholder]
        .into_iter()
        .flatten()
        .map(|l| l.trim())
        .find(|l| !l.is_empty());

    match candidate {
        Some(label) => {
            let stripped = label.trim_end_matches(|c: char| c == '*' || c.is_whitespace());
            let starred = stripped.len() < label.len() && label.ends_with('*');
            if stripped.is_empty() {
                (humanize(raw_name), starred)
            } else {
                (stripped.to_string(), starred)
            }
        }
        None => (humanize(raw_name), false),
    }
}

/// Radio labels name the choice, not the question.
fn group_label(element: &RawElement, raw_name: &str) -> String {
    element
        .aria_label
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| humanize(raw_name))
}

fn radio_choice(element: &RawElement) -> Option<String> {
    element
        .label
        .as_deref()
        .or(element.value.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn humanize(raw_name: &str) -> String {
    let words = normalize_key(raw_name).replace('_', " ");
    let mut chars = words.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Template strategy
// ────────────────────────────────────────────────────────────────────────────

/// Platform taxonomy first, then any custom questions the page adds.
pub struct TemplateStrategy {
    name: &'static str,
    template: fn() -> Vec<FormField>,
}

impl TemplateStrategy {
    pub fn new(name: &'static str, template: fn() -> Vec<FormField>) -> Self {
        Self { name, template }
    }
}

impl ExtractionStrategy for TemplateStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(
        &self,
        document: &RawDocument,
        platform: &PlatformInfo,
        synonyms: &SynonymTable,
    ) -> Result<FormSchema, ExtractionError> {
        let mut fields = (self.template)();
        for extra in scan_fields(document, synonyms) {
            if !fields.iter().any(|f| f.name == extra.name) {
                fields.push(extra);
            }
        }
        Ok(FormSchema::new(platform.id, fields)?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extractor
// ────────────────────────────────────────────────────────────────────────────

pub struct FormSchemaExtractor {
    fetcher: Arc<dyn PageFetcher>,
    synonyms: Arc<SynonymTable>,
    strategies: HashMap<PlatformId, Arc<dyn ExtractionStrategy>>,
    generic: GenericStrategy,
}

impl FormSchemaExtractor {
    /// Extractor with the built-in platform templates registered.
    pub fn new(fetcher: Arc<dyn PageFetcher>, synonyms: Arc<SynonymTable>) -> Self {
        let ats: Arc<dyn ExtractionStrategy> = Arc::new(TemplateStrategy::new("ats", ats_fields));
        let job_board: Arc<dyn ExtractionStrategy> =
            Arc::new(TemplateStrategy::new("job_board", job_board_fields));
        let easy_apply: Arc<dyn ExtractionStrategy> =
            Arc::new(TemplateStrategy::new("easy_apply", easy_apply_fields));

        let mut extractor = Self {
            fetcher,
            synonyms,
            strategies: HashMap::new(),
            generic: GenericStrategy,
        };
        for platform in [PlatformId::Greenhouse, PlatformId::Workday, PlatformId::Lever] {
            extractor.register(platform, ats.clone());
        }
        for platform in [PlatformId::Indeed, PlatformId::Glassdoor] {
            extractor.register(platform, job_board.clone());
        }
        extractor.register(PlatformId::LinkedIn, easy_apply);
        extractor
    }

    pub fn register(&mut self, platform: PlatformId, strategy: Arc<dyn ExtractionStrategy>) {
        self.strategies.insert(platform, strategy);
    }

    /// Fetches the job page, giving up with `Timeout` once `deadline` passes.
    pub async fn fetch_document(
        &self,
        url: &str,
        deadline: Instant,
    ) -> Result<RawDocument, ExtractionError> {
        match timeout_at(deadline, self.fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout),
        }
    }

    pub fn extract_document(
        &self,
        document: &RawDocument,
        platform: &PlatformInfo,
    ) -> Result<FormSchema, ExtractionError> {
        let strategy: &dyn ExtractionStrategy = match self.strategies.get(&platform.id) {
            Some(strategy) => strategy.as_ref(),
            None => &self.generic,
        };
        let schema = strategy.extract(document, platform, &self.synonyms)?;
        debug!(
            "Extracted {} fields ({} required) from {} using {} strategy",
            schema.len(),
            schema.required_fields().len(),
            document.url,
            strategy.name()
        );
        Ok(schema)
    }

    pub async fn extract(
        &self,
        url: &str,
        platform: &PlatformInfo,
        deadline: Instant,
    ) -> Result<FormSchema, ExtractionError> {
        let document = self.fetch_document(url, deadline).await?;
        self.extract_document(&document, platform)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::platform::PlatformClassifier;
    use crate::testing::{element, StaticPageFetcher};

    fn synonyms() -> Arc<SynonymTable> {
        Arc::new(SynonymTable::builtin().unwrap())
    }

    fn document(elements: Vec<RawElement>) -> RawDocument {
        RawDocument {
            url: "https://example.org/apply".to_string(),
            elements,
            ..Default::default()
        }
    }

    #[test]
    fn test_generic_scan_normalizes_and_marks_required() {
        let mut first = element("firstName", "text");
        first.label = Some("First Name *".to_string());
        let mut email = element("applicant[email]", "email");
        email.required = true;
        email.label = Some("Email Address".to_string());
        let mut phone = element("q_1234", "tel");
        phone.label = Some("Phone Number".to_string());

        let fields = scan_fields(&document(vec![first, email, phone]), &synonyms());
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first_name", "email", "phone"]);
        assert_eq!(fields[0].label, "First Name");
        assert!(fields[0].required, "asterisk marks the field required");
        assert!(fields[1].required);
        assert!(!fields[2].required);
        assert_eq!(fields[2].field_type, FieldType::Phone);
    }

    #[test]
    fn test_generic_scan_skips_hidden_and_buttons() {
        let fields = scan_fields(
            &document(vec![
                element("csrf", "hidden"),
                element("go", "submit"),
                element("email", "email"),
            ]),
            &synonyms(),
        );
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_type, FieldType::Email);
    }

    #[test]
    fn test_generic_scan_groups_radio_buttons() {
        let mut yes = element("relocate", "radio");
        yes.value = Some("Yes".to_string());
        let mut no = element("relocate", "radio");
        no.value = Some("No".to_string());
        no.required = true;

        let fields = scan_fields(&document(vec![yes, no]), &synonyms());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "willing_to_relocate");
        assert_eq!(fields[0].field_type, FieldType::Select);
        assert_eq!(fields[0].options, vec!["Yes", "No"]);
        assert!(fields[0].required);
    }

    #[test]
    fn test_generic_scan_keeps_first_duplicate_key() {
        let mut a = element("fname", "text");
        a.required = true;
        let b = element("first_name", "text");
        let fields = scan_fields(&document(vec![a, b]), &synonyms());
        assert_eq!(fields.len(), 1);
        assert!(fields[0].required);
    }

    #[test]
    fn test_generic_strategy_rejects_page_without_form() {
        let platform = PlatformInfo::unknown();
        let err = GenericStrategy
            .extract(&document(vec![]), &platform, &synonyms())
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NoForm(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_unknown_platform_falls_back_to_generic() {
        let fetcher = Arc::new(StaticPageFetcher::default());
        let extractor = FormSchemaExtractor::new(fetcher, synonyms());
        let platform = PlatformClassifier
            .classify("https://example.org/apply")
            .unwrap();
        let schema = extractor
            .extract_document(&document(vec![element("email", "email")]), &platform)
            .unwrap();
        assert_eq!(schema.platform(), PlatformId::Unknown);
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_template_strategy_appends_custom_questions() {
        let fetcher = Arc::new(StaticPageFetcher::default());
        let extractor = FormSchemaExtractor::new(fetcher, synonyms());
        let platform = PlatformClassifier
            .classify("https://boards.greenhouse.io/acme/jobs/1")
            .unwrap();

        let mut custom = element("question_991", "text");
        custom.label = Some("Favourite editor".to_string());
        let mut email = element("job_application[email]", "email");
        email.label = Some("Email".to_string());

        let schema = extractor
            .extract_document(&document(vec![email, custom]), &platform)
            .unwrap();
        assert_eq!(schema.len(), ats_fields().len() + 1);
        assert!(schema.field("question_991").is_some());
        // Shared keys keep the template definition
        assert!(schema.is_required("email"));
    }

    #[tokio::test]
    async fn test_extract_reports_unreachable_page() {
        let fetcher = Arc::new(StaticPageFetcher::default());
        let extractor = FormSchemaExtractor::new(fetcher, synonyms());
        let deadline = Instant::now() + Duration::from_secs(5);
        let err = extractor
            .extract("https://example.org/missing", &PlatformInfo::unknown(), deadline)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_honours_deadline() {
        let fetcher = Arc::new(StaticPageFetcher::default().with_delay(Duration::from_secs(60)));
        let extractor = FormSchemaExtractor::new(fetcher, synonyms());
        let deadline = Instant::now() + Duration::from_secs(30);
        let err = extractor
            .fetch_document("https://example.org/slow", deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Timeout));
    }
}
