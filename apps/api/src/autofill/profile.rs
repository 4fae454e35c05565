//! Profile Provider: baseline identity, contact and resume data per user.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::profile::UserProfileRow;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceItem {
    pub company: String,
    pub title: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationItem {
    pub institution: String,
    pub degree: String,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<i32>,
}

/// Read-only input to matching. Experience and education are most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin: String,
    pub portfolio: String,
    pub github: String,
    pub resume_url: String,
    pub experience: Vec<ExperienceItem>,
    pub education: Vec<EducationItem>,
    pub skills: BTreeSet<String>,
}

impl UserProfile {
    /// Value of the profile attribute behind a canonical field key. Blank
    /// attributes never resolve.
    pub fn value_for(&self, key: &str) -> Option<String> {
        let value = match key {
            "first_name" => self.first_name.trim().to_string(),
            "last_name" => self.last_name.trim().to_string(),
            "full_name" => format!("{} {}", self.first_name.trim(), self.last_name.trim())
                .trim()
                .to_string(),
            "email" => self.email.trim().to_string(),
            "phone" => self.phone.trim().to_string(),
            "location" => self.location.trim().to_string(),
            "linkedin_url" => self.linkedin.trim().to_string(),
            "portfolio_url" => self.portfolio.trim().to_string(),
            "github_url" => self.github.trim().to_string(),
            "resume" => self.resume_url.trim().to_string(),
            "current_company" => self.latest_role()?.company.trim().to_string(),
            "current_title" => self.latest_role()?.title.trim().to_string(),
            "education_level" => self.education.first()?.degree.trim().to_string(),
            "skills" => self
                .skills
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    }

    fn latest_role(&self) -> Option<&ExperienceItem> {
        self.experience
            .iter()
            .find(|e| e.current)
            .or_else(|| self.experience.first())
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile lookup failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored profile for user {user_id} is malformed: {reason}")]
    Malformed { user_id: Uuid, reason: String },
}

#[async_trait]
pub trait ProfileProvider: Send + Sync {
    /// `None` when the user has no stored profile.
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, ProfileError>;
}

#[derive(Clone)]
pub struct PgProfileProvider {
    pool: PgPool,
}

impl PgProfileProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileProvider for PgProfileProvider {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, ProfileError> {
        let row = sqlx::query_as::<_, UserProfileRow>(
            "SELECT * FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            row.into_profile().map_err(|e| ProfileError::Malformed {
                user_id,
                reason: e.to_string(),
            })
        })
        .transpose()
    }
}
