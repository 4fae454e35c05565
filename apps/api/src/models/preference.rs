use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PreferenceRow {
    pub user_id: Uuid,
    pub field_key: String,
    pub field_value: String,
    pub usage_count: i32,
    pub last_used: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
