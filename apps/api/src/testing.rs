//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::applications::{ApplicationEngine, EngineDeps};
use crate::autofill::planner::ApplicationData;
use crate::autofill::preferences::{
    writable_entries, PreferenceRecord, PreferenceStore, StoreError,
};
use crate::autofill::profile::{ProfileError, ProfileProvider, UserProfile};
use crate::config::Config;
use crate::forms::cache::SchemaCache;
use crate::forms::document::{scan_html, PageFetcher, RawDocument, RawElement};
use crate::forms::extractor::{ExtractionError, FormSchemaExtractor};
use crate::forms::normalize::SynonymTable;
use crate::jobs::MetadataJobParser;
use crate::models::submission::SubmissionRow;
use crate::state::AppState;
use crate::submission::adapters::ManualHandoffAdapter;
use crate::submission::history::SubmissionHistory;
use crate::submission::orchestrator::{
    SubmissionAdapter, SubmissionError, SubmissionOrchestrator, SubmissionResult,
    SubmissionStatus,
};

pub fn element(name: &str, input_type: &str) -> RawElement {
    RawElement {
        input_type: Some(input_type.to_string()),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

/// Serves canned pages; unknown URLs are unreachable.
#[derive(Default)]
pub struct StaticPageFetcher {
    pages: HashMap<String, RawDocument>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl StaticPageFetcher {
    pub fn with_html(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), scan_html(url, html));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StaticPageFetcher {
    async fn fetch(&self, url: &str) -> Result<RawDocument, ExtractionError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ExtractionError::Unreachable(format!("{url} returned HTTP 404")))
    }
}

#[derive(Default)]
pub struct InMemoryProfileProvider {
    profiles: HashMap<Uuid, UserProfile>,
}

impl InMemoryProfileProvider {
    pub fn with_profile(mut self, user_id: Uuid, profile: UserProfile) -> Self {
        self.profiles.insert(user_id, profile);
        self
    }
}

#[async_trait]
impl ProfileProvider for InMemoryProfileProvider {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, ProfileError> {
        Ok(self.profiles.get(&user_id).cloned())
    }
}

type UserSlot = Arc<tokio::sync::Mutex<BTreeMap<String, String>>>;

/// Per-user lock held for a whole batch; yields between writes so that an
/// unserialized store would interleave.
#[derive(Default)]
pub struct InMemoryPreferenceStore {
    users: Mutex<HashMap<Uuid, UserSlot>>,
}

impl InMemoryPreferenceStore {
    fn slot(&self, user_id: Uuid) -> UserSlot {
        let mut users = self.users.lock().unwrap();
        users.entry(user_id).or_default().clone()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn get(&self, user_id: Uuid) -> Result<PreferenceRecord, StoreError> {
        let slot = self.slot(user_id);
        let values = slot.lock().await;
        Ok(values.clone().into_iter().collect())
    }

    async fn put_batch(
        &self,
        user_id: Uuid,
        entries: &[(String, String)],
    ) -> Result<usize, StoreError> {
        let entries = writable_entries(entries);
        if entries.is_empty() {
            return Ok(0);
        }
        let slot = self.slot(user_id);
        let mut values = slot.lock().await;
        for (&key, &value) in &entries {
            values.insert(key.to_string(), value.to_string());
            tokio::task::yield_now().await;
        }
        Ok(entries.len())
    }
}

pub struct FailingPreferenceStore;

#[async_trait]
impl PreferenceStore for FailingPreferenceStore {
    async fn get(&self, _user_id: Uuid) -> Result<PreferenceRecord, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn put_batch(
        &self,
        _user_id: Uuid,
        _entries: &[(String, String)],
    ) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Adapter with a fixed outcome that counts its calls.
pub struct ScriptedAdapter {
    outcome: Result<(), SubmissionError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn succeeding() -> Self {
        Self {
            outcome: Ok(()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: SubmissionError) -> Self {
        Self {
            outcome: Err(err),
            ..Self::succeeding()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionAdapter for ScriptedAdapter {
    fn method(&self) -> &'static str {
        "scripted"
    }

    async fn submit(
        &self,
        application: &ApplicationData,
    ) -> Result<SubmissionResult, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()?;
        Ok(SubmissionResult {
            success: true,
            application_id: Some("app_test".to_string()),
            status: SubmissionStatus::Submitted,
            platform: application.platform.name.clone(),
            submission_method: self.method().to_string(),
            message: "submitted".to_string(),
            diagnostics: Vec::new(),
            next_steps: Vec::new(),
            requires_manual: false,
            tracking_url: None,
            submitted_at: Some(chrono::Utc::now()),
        })
    }
}

#[derive(Default)]
pub struct InMemorySubmissionHistory {
    rows: Mutex<Vec<SubmissionRow>>,
}

impl InMemorySubmissionHistory {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl SubmissionHistory for InMemorySubmissionHistory {
    async fn record(&self, row: &SubmissionRow) -> Result<(), StoreError> {
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }

    async fn list(&self, user_id: Uuid, limit: i64) -> Result<Vec<SubmissionRow>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

/// Engine over in-memory collaborators; every submission is handed off.
pub fn engine(fetcher: StaticPageFetcher) -> ApplicationEngine {
    let synonyms = Arc::new(SynonymTable::builtin().unwrap());
    ApplicationEngine::new(EngineDeps {
        extractor: FormSchemaExtractor::new(Arc::new(fetcher), synonyms.clone()),
        job_parser: Arc::new(MetadataJobParser),
        cache: SchemaCache::disabled(),
        profiles: Arc::new(InMemoryProfileProvider::default()),
        preferences: Arc::new(InMemoryPreferenceStore::default()),
        history: Arc::new(InMemorySubmissionHistory::default()),
        orchestrator: SubmissionOrchestrator::new(Arc::new(ManualHandoffAdapter)),
        synonyms,
        analyze_timeout: Duration::from_secs(30),
        submit_timeout: Duration::from_secs(120),
    })
}

/// App state whose database pool never connects.
pub fn app_state(engine: ApplicationEngine) -> AppState {
    const DATABASE_URL: &str = "postgres://formpilot@127.0.0.1:1/formpilot";
    let db = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy(DATABASE_URL)
        .unwrap();
    let config =
        Config::from_lookup(|key| (key == "DATABASE_URL").then(|| DATABASE_URL.to_string()))
            .unwrap();
    AppState {
        db,
        config,
        engine: Arc::new(engine),
    }
}
