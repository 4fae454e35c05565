//! Platform Classifier: maps a job-posting URL to a known application platform.
//!
//! Rules are an ordered list evaluated against host, path and query; the first
//! match wins. Unrecognised hosts resolve to `PlatformId::Unknown` so the rest of
//! the pipeline can fall back to generic extraction instead of rejecting the URL.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformId {
    #[serde(rename = "linkedin")]
    LinkedIn,
    Indeed,
    Glassdoor,
    Wellfound,
    Greenhouse,
    Workday,
    Lever,
    CompanyCareers,
    Unknown,
}

impl PlatformId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::LinkedIn => "linkedin",
            PlatformId::Indeed => "indeed",
            PlatformId::Glassdoor => "glassdoor",
            PlatformId::Wellfound => "wellfound",
            PlatformId::Greenhouse => "greenhouse",
            PlatformId::Workday => "workday",
            PlatformId::Lever => "lever",
            PlatformId::CompanyCareers => "company_careers",
            PlatformId::Unknown => "unknown",
        }
    }
}

/// Broad family of a platform. Extraction templates and submission adapters
/// are keyed off this rather than the individual vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    Social,
    JobBoard,
    Startup,
    CompanyAts,
    CompanyCareers,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub id: PlatformId,
    pub name: String,
    pub kind: PlatformKind,
    pub supports_auto: bool,
    pub requires_manual: bool,
}

impl PlatformInfo {
    fn new(id: PlatformId, name: impl Into<String>, kind: PlatformKind) -> Self {
        let (supports_auto, requires_manual) = match kind {
            PlatformKind::Social | PlatformKind::JobBoard | PlatformKind::Startup => (true, false),
            PlatformKind::CompanyAts => (true, true),
            PlatformKind::CompanyCareers | PlatformKind::Unknown => (false, true),
        };
        Self {
            id,
            name: name.into(),
            kind,
            supports_auto,
            requires_manual,
        }
    }

    pub fn unknown() -> Self {
        Self::new(PlatformId::Unknown, "Unknown", PlatformKind::Unknown)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ClassificationError {
    #[error("invalid job URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("job URL '{0}' has no host")]
    MissingHost(String),
}

/// One classification rule. Every populated condition must hold.
#[derive(Debug, Clone, Copy)]
struct PlatformRule {
    platform: PlatformId,
    domain: Option<&'static str>,
    path_contains: Option<&'static str>,
    query_contains: Option<&'static str>,
}

impl PlatformRule {
    const fn to(platform: PlatformId) -> Self {
        Self {
            platform,
            domain: None,
            path_contains: None,
            query_contains: None,
        }
    }

    /// The host is `domain` or one of its subdomains.
    const fn on(mut self, domain: &'static str) -> Self {
        self.domain = Some(domain);
        self
    }

    const fn path_has(mut self, fragment: &'static str) -> Self {
        self.path_contains = Some(fragment);
        self
    }

    const fn query_has(mut self, fragment: &'static str) -> Self {
        self.query_contains = Some(fragment);
        self
    }

    fn matches(&self, target: &UrlParts<'_>) -> bool {
        self.domain.map_or(true, |d| on_domain(target.host, d))
            && self.path_contains.map_or(true, |p| target.path.contains(p))
            && self.query_contains.map_or(true, |q| target.query.contains(q))
    }
}

fn on_domain(host: &str, domain: &str) -> bool {
    host.strip_suffix(domain)
        .is_some_and(|rest| rest.is_empty() || rest.ends_with('.'))
}

struct UrlParts<'a> {
    host: &'a str,
    path: &'a str,
    query: &'a str,
}

const RULES: &[PlatformRule] = &[
    PlatformRule::to(PlatformId::LinkedIn).on("linkedin.com"),
    PlatformRule::to(PlatformId::Indeed).on("indeed.com"),
    PlatformRule::to(PlatformId::Glassdoor).on("glassdoor.com"),
    PlatformRule::to(PlatformId::Wellfound).on("angel.co"),
    PlatformRule::to(PlatformId::Wellfound).on("wellfound.com"),
    PlatformRule::to(PlatformId::Greenhouse).query_has("gh_jid"),
    PlatformRule::to(PlatformId::Greenhouse).on("greenhouse.io"),
    PlatformRule::to(PlatformId::Greenhouse).path_has("/greenhouse/"),
    PlatformRule::to(PlatformId::Greenhouse)
        .path_has("/careers")
        .query_has("board"),
    PlatformRule::to(PlatformId::Workday).on("myworkdayjobs.com"),
    PlatformRule::to(PlatformId::Workday).on("workday.com"),
    PlatformRule::to(PlatformId::Lever).on("lever.co"),
    PlatformRule::to(PlatformId::Lever)
        .path_has("/jobs/")
        .query_has("lever"),
    PlatformRule::to(PlatformId::CompanyCareers).path_has("/careers"),
    PlatformRule::to(PlatformId::CompanyCareers).path_has("/jobs"),
];

#[derive(Debug, Clone, Default)]
pub struct PlatformClassifier;

impl PlatformClassifier {
    /// Classifies a job URL. Only structurally invalid URLs fail.
    pub fn classify(&self, job_url: &str) -> Result<PlatformInfo, ClassificationError> {
        let parsed = Url::parse(job_url.trim()).map_err(|e| ClassificationError::InvalidUrl {
            url: job_url.to_string(),
            reason: e.to_string(),
        })?;

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ClassificationError::MissingHost(job_url.to_string()))?
            .to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        let target = UrlParts {
            host,
            path: parsed.path(),
            query: parsed.query().unwrap_or(""),
        };

        let platform = RULES
            .iter()
            .find(|rule| rule.matches(&target))
            .map(|rule| rule.platform)
            .unwrap_or(PlatformId::Unknown);

        Ok(describe(platform, host))
    }
}

fn describe(platform: PlatformId, host: &str) -> PlatformInfo {
    match platform {
        PlatformId::LinkedIn => PlatformInfo::new(platform, "LinkedIn", PlatformKind::Social),
        PlatformId::Indeed => PlatformInfo::new(platform, "Indeed", PlatformKind::JobBoard),
        PlatformId::Glassdoor => PlatformInfo::new(platform, "Glassdoor", PlatformKind::JobBoard),
        PlatformId::Wellfound => PlatformInfo::new(platform, "Wellfound", PlatformKind::Startup),
        PlatformId::Greenhouse => {
            PlatformInfo::new(platform, "Greenhouse ATS", PlatformKind::CompanyAts)
        }
        PlatformId::Workday => PlatformInfo::new(platform, "Workday ATS", PlatformKind::CompanyAts),
        PlatformId::Lever => PlatformInfo::new(platform, "Lever ATS", PlatformKind::CompanyAts),
        PlatformId::CompanyCareers => PlatformInfo::new(
            platform,
            format!("{} Careers", company_from_host(host)),
            PlatformKind::CompanyCareers,
        ),
        PlatformId::Unknown => PlatformInfo::unknown(),
    }
}

/// Title-cases the first host label, e.g. `acme.com` → `Acme`.
pub fn company_from_host(host: &str) -> String {
    let host = host.strip_prefix("www.").unwrap_or(host);
    let label = host.split('.').next().unwrap_or_default();
    let mut chars = label.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
