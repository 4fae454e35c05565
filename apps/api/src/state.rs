use std::sync::Arc;

use sqlx::PgPool;

use crate::applications::ApplicationEngine;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Form intelligence engine behind every `/api/v1` route.
    pub engine: Arc<ApplicationEngine>,
}
