use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::autofill::profile::UserProfile;

#[derive(Debug, Clone, FromRow)]
pub struct UserProfileRow {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin_url: String,
    pub portfolio_url: String,
    pub github_url: String,
    pub resume_url: String,
    pub experience: Value,
    pub education: Value,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfileRow {
    pub fn into_profile(self) -> Result<UserProfile, serde_json::Error> {
        Ok(UserProfile {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            location: self.location,
            linkedin: self.linkedin_url,
            portfolio: self.portfolio_url,
            github: self.github_url,
            resume_url: self.resume_url,
            experience: serde_json::from_value(self.experience)?,
            education: serde_json::from_value(self.education)?,
            skills: self.skills.into_iter().collect(),
        })
    }
}
