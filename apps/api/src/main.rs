mod applications;
mod autofill;
mod config;
mod db;
mod errors;
mod forms;
mod jobs;
mod models;
mod platform;
mod routes;
mod state;
mod submission;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::applications::{ApplicationEngine, EngineDeps};
use crate::autofill::preferences::PgPreferenceStore;
use crate::autofill::profile::PgProfileProvider;
use crate::config::Config;
use crate::db::create_pool;
use crate::forms::cache::SchemaCache;
use crate::forms::document::HttpPageFetcher;
use crate::forms::extractor::FormSchemaExtractor;
use crate::forms::normalize::SynonymTable;
use crate::jobs::MetadataJobParser;
use crate::platform::PlatformKind;
use crate::routes::build_router;
use crate::state::AppState;
use crate::submission::adapters::{HttpFormAdapter, ManualHandoffAdapter};
use crate::submission::history::PgSubmissionHistory;
use crate::submission::orchestrator::SubmissionOrchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting FormPilot API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis schema cache, if configured
    let cache = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("invalid REDIS_URL")?;
            info!(
                "Redis schema cache enabled (ttl {}s)",
                config.schema_cache_ttl.as_secs()
            );
            SchemaCache::new(client, config.schema_cache_ttl)
        }
        None => {
            info!("REDIS_URL not set; schema cache disabled");
            SchemaCache::disabled()
        }
    };

    // Synonym table: file override or the built-in one
    let synonyms = Arc::new(match &config.synonyms_path {
        Some(path) => SynonymTable::from_path(path)?,
        None => SynonymTable::builtin()?,
    });
    info!("Synonym table v{} loaded", synonyms.version());

    let fetcher = Arc::new(
        HttpPageFetcher::new(config.analyze_timeout).context("failed to build page fetcher")?,
    );

    let orchestrator = build_orchestrator(&config)?;

    let engine = ApplicationEngine::new(EngineDeps {
        extractor: FormSchemaExtractor::new(fetcher, synonyms.clone()),
        job_parser: Arc::new(MetadataJobParser),
        cache,
        profiles: Arc::new(PgProfileProvider::new(db.clone())),
        preferences: Arc::new(PgPreferenceStore::new(db.clone())),
        history: Arc::new(PgSubmissionHistory::new(db.clone())),
        orchestrator,
        synonyms,
        analyze_timeout: config.analyze_timeout,
        submit_timeout: config.submit_timeout,
    });

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        engine: Arc::new(engine),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Manual handoff for everything unless HTTP form submission is enabled, in
/// which case automatable platform kinds post directly.
fn build_orchestrator(config: &Config) -> Result<SubmissionOrchestrator> {
    let mut orchestrator = SubmissionOrchestrator::new(Arc::new(ManualHandoffAdapter));
    if !config.http_submission_enabled {
        info!("HTTP submission disabled; applications will be handed off for manual completion");
        return Ok(orchestrator);
    }

    let http = Arc::new(
        HttpFormAdapter::new(config.submit_timeout).context("failed to build submission client")?,
    );
    for kind in [
        PlatformKind::Social,
        PlatformKind::JobBoard,
        PlatformKind::Startup,
        PlatformKind::CompanyAts,
    ] {
        orchestrator.register(kind, http.clone());
    }
    info!("HTTP form submission enabled");
    Ok(orchestrator)
}
