//! Job metadata parsing: `RawDocument` → `JobPosting`.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::forms::document::RawDocument;
use crate::forms::extractor::ExtractionError;
use crate::platform::{company_from_host, PlatformInfo};

/// Words that mark a bullet as a requirement rather than a perk.
const QUALIFICATION_SIGNALS: &[&str] = &[
    "experience",
    "years",
    "degree",
    "bachelor",
    "master",
    "proficien",
    "knowledge of",
    "familiar",
    "required",
    "must have",
    "ability to",
    "skills",
];

/// Normalized job metadata. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub url: String,
    pub platform: PlatformInfo,
    pub title: String,
    pub company: String,
    pub description: String,
    pub required_qualifications: Vec<String>,
    /// Where the application form posts to, when the page declares it.
    pub application_url: Option<String>,
}

pub trait JobParser: Send + Sync {
    fn parse(
        &self,
        document: &RawDocument,
        platform: &PlatformInfo,
    ) -> Result<JobPosting, ExtractionError>;
}

/// Reads Open Graph / HTML metadata and requirement-looking list items.
#[derive(Debug, Clone, Default)]
pub struct MetadataJobParser;

impl JobParser for MetadataJobParser {
    fn parse(
        &self,
        document: &RawDocument,
        platform: &PlatformInfo,
    ) -> Result<JobPosting, ExtractionError> {
        let url = Url::parse(&document.url)
            .map_err(|e| ExtractionError::Unreachable(format!("{}: {e}", document.url)))?;

        let title = meta(document, "og:title")
            .or(document.title.as_deref())
            .map(clean_title)
            .unwrap_or_else(|| "Untitled position".to_string());

        let company = meta(document, "og:site_name")
            .map(str::to_string)
            .or_else(|| board_param(&url))
            .or_else(|| url.host_str().map(company_from_host))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Unknown company".to_string());

        let description = meta(document, "og:description")
            .or_else(|| meta(document, "description"))
            .unwrap_or_default()
            .to_string();

        let required_qualifications = document
            .list_items
            .iter()
            .filter(|item| is_qualification(item))
            .cloned()
            .collect();

        Ok(JobPosting {
            url: document.url.clone(),
            platform: platform.clone(),
            title,
            company,
            description,
            required_qualifications,
            application_url: document.form_action.clone(),
        })
    }
}

fn meta<'a>(document: &'a RawDocument, key: &str) -> Option<&'a str> {
    document
        .meta
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Greenhouse-hosted career pages name the company in `?board=`.
fn board_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == "board" || k == "for")
        .map(|(_, v)| company_from_host(&v))
        .filter(|c| !c.is_empty())
}

/// Drops a trailing " | Site" suffix from page titles.
fn clean_title(raw: &str) -> String {
    let raw = raw.trim();
    raw.rsplit_once(" | ")
        .map(|(head, _)| head)
        .unwrap_or(raw)
        .trim()
        .to_string()
}

fn is_qualification(item: &str) -> bool {
    let lower = item.to_lowercase();
    QUALIFICATION_SIGNALS.iter().any(|s| lower.contains(s))
}
