//! Redis-backed cache of extracted form schemas, keyed by (platform, url).
//!
//! Caching is an optimization only: every failure is logged and treated as a
//! miss so extraction always has the final say.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::forms::models::FormSchema;
use crate::platform::PlatformId;

#[derive(Clone)]
pub struct SchemaCache {
    client: Option<redis::Client>,
    ttl: Duration,
}

impl SchemaCache {
    pub fn new(client: redis::Client, ttl: Duration) -> Self {
        Self {
            client: Some(client),
            ttl,
        }
    }

    /// A cache that never hits and never stores.
    pub fn disabled() -> Self {
        Self {
            client: None,
            ttl: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some() && !self.ttl.is_zero()
    }

    pub async fn get(&self, platform: PlatformId, url: &str) -> Option<FormSchema> {
        let client = self.client.as_ref().filter(|_| self.is_enabled())?;
        let key = cache_key(platform, url);

        let raw: Option<String> = match client.get_multiplexed_async_connection().await {
            Ok(mut conn) => match conn.get(&key).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Schema cache read failed for {key}: {e}");
                    return None;
                }
            },
            Err(e) => {
                warn!("Schema cache unavailable: {e}");
                return None;
            }
        };

        let schema = match serde_json::from_str::<FormSchema>(&raw?) {
            Ok(schema) => schema,
            Err(e) => {
                warn!("Discarding malformed cached schema {key}: {e}");
                return None;
            }
        };
        debug!("Schema cache hit for {key}");
        Some(schema)
    }

    pub async fn put(&self, url: &str, schema: &FormSchema) {
        let Some(client) = self.client.as_ref().filter(|_| self.is_enabled()) else {
            return;
        };
        let key = cache_key(schema.platform(), url);

        let payload = match serde_json::to_string(schema) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize schema for {key}: {e}");
                return;
            }
        };

        let result = match client.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                conn.set_ex::<_, _, ()>(&key, payload, self.ttl.as_secs())
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("Schema cache write failed for {key}: {e}");
        }
    }
}

fn cache_key(platform: PlatformId, url: &str) -> String {
    format!("formschema:{}:{}", platform.as_str(), url.trim())
}
