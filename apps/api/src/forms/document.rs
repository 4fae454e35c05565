//! Raw document model handed to the extraction strategies, plus the page-fetch
//! collaborator that produces it.
//!
//! The engine never sees HTML: `HttpPageFetcher` does a light tag scan and emits
//! a flat, ordered list of input-like elements with their labels resolved.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::forms::extractor::ExtractionError;

const USER_AGENT: &str = concat!("formpilot/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementTag {
    #[default]
    Input,
    Select,
    Textarea,
}

/// One input-like element as it appeared on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    pub tag: ElementTag,
    /// `type` attribute for inputs, lower-cased.
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub aria_label: Option<String>,
    pub required: bool,
    pub aria_required: bool,
    pub value: Option<String>,
    pub options: Vec<String>,
}

/// A fetched job page reduced to the parts the engine consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub url: String,
    pub title: Option<String>,
    /// `<meta>` tags keyed by `property` or `name`, lower-cased.
    pub meta: BTreeMap<String, String>,
    /// Absolute URL of the first form's `action`, if any.
    pub form_action: Option<String>,
    pub list_items: Vec<String>,
    pub elements: Vec<RawElement>,
}

/// Page-fetch collaborator: URL in, reduced document out.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawDocument, ExtractionError>;
}

#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<RawDocument, ExtractionError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout
            } else {
                ExtractionError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Unreachable(format!(
                "{url} returned HTTP {status}"
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ExtractionError::Unreachable(e.to_string()))?;

        let document = scan_html(url, &html);
        debug!(
            "Scanned {url}: {} elements, {} list items",
            document.elements.len(),
            document.list_items.len()
        );
        Ok(document)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tag scanning
// ────────────────────────────────────────────────────────────────────────────

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex compiles"))
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<title[^>]*>(.*?)</title>")
}

fn meta_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<meta\b([^>]*)>")
}

fn form_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<form\b([^>]*)>")
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<label\b([^>]*)>(.*?)</label>")
}

fn field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<(input|select|textarea)\b([^>]*)>")
}

fn select_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)</select\s*>")
}

fn option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<option\b([^>]*)>(.*?)</option>")
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<li\b[^>]*>(.*?)</li>")
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<[^>]*>")
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#,
    )
}

/// Reduces an HTML page to a `RawDocument`.
pub fn scan_html(page_url: &str, html: &str) -> RawDocument {
    let title = title_re()
        .captures(html)
        .map(|c| text_content(&c[1]))
        .filter(|t| !t.is_empty());

    let mut meta = BTreeMap::new();
    for cap in meta_re().captures_iter(html) {
        let attrs = parse_attrs(&cap[1]);
        let key = attrs.get("property").or_else(|| attrs.get("name"));
        if let (Some(key), Some(content)) = (key, attrs.get("content")) {
            meta.insert(key.to_ascii_lowercase(), decode_entities(content));
        }
    }

    let form_action = form_re()
        .captures(html)
        .and_then(|c| parse_attrs(&c[1]).remove("action"))
        .filter(|a| !a.trim().is_empty())
        .and_then(|action| {
            Url::parse(page_url)
                .and_then(|base| base.join(action.trim()))
                .ok()
        })
        .map(|u| u.to_string());

    let labels: HashMap<String, String> = label_re()
        .captures_iter(html)
        .filter_map(|c| {
            let target = parse_attrs(&c[1]).remove("for")?;
            Some((target, text_content(&c[2])))
        })
        .collect();

    let mut elements = Vec::new();
    for cap in field_re().captures_iter(html) {
        let tag = match cap[1].to_ascii_lowercase().as_str() {
            "select" => ElementTag::Select,
            "textarea" => ElementTag::Textarea,
            _ => ElementTag::Input,
        };
        let mut attrs = parse_attrs(&cap[2]);
        let end = cap.get(0).map_or(0, |m| m.end());

        let options = if tag == ElementTag::Select {
            let body_end = select_end_re()
                .find_at(html, end)
                .map_or(html.len(), |m| m.start());
            scan_options(&html[end..body_end])
        } else {
            Vec::new()
        };

        let id = attrs.remove("id");
        let label = id.as_ref().and_then(|id| labels.get(id).cloned());
        elements.push(RawElement {
            tag,
            input_type: attrs.remove("type").map(|t| t.to_ascii_lowercase()),
            name: attrs.remove("name"),
            label,
            placeholder: attrs.remove("placeholder"),
            aria_label: attrs.remove("aria-label"),
            required: attrs.contains_key("required"),
            aria_required: attrs
                .get("aria-required")
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            value: attrs.remove("value"),
            id,
            options,
        });
    }

    let list_items = list_item_re()
        .captures_iter(html)
        .map(|c| text_content(&c[1]))
        .filter(|t| !t.is_empty())
        .collect();

    RawDocument {
        url: page_url.to_string(),
        title,
        meta,
        form_action,
        list_items,
        elements,
    }
}

fn scan_options(body: &str) -> Vec<String> {
    option_re()
        .captures_iter(body)
        .filter_map(|c| {
            let attrs = parse_attrs(&c[1]);
            // Placeholder entries ("Select...") carry an empty value.
            if attrs.get("value").is_some_and(|v| v.trim().is_empty()) {
                return None;
            }
            let text = text_content(&c[2]);
            let text = if text.is_empty() {
                attrs.get("value").cloned().unwrap_or_default()
            } else {
                text
            };
            (!text.is_empty()).then_some(text)
        })
        .collect()
}

fn parse_attrs(raw: &str) -> HashMap<String, String> {
    attr_re()
        .captures_iter(raw)
        .map(|c| {
            let name = c[1].to_ascii_lowercase();
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

fn text_content(fragment: &str) -> String {
    let stripped = tag_re().replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
