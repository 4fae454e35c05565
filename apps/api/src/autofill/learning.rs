//! Learning Loop: captures confirmed answers for the next application.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::autofill::preferences::{PreferenceStore, StoreError};
use crate::autofill::FieldValues;
use crate::forms::normalize::SynonymTable;

/// Percentage of filled fields; 0 for an empty form.
pub fn success_rate(filled: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    filled as f64 / total as f64 * 100.0
}

/// Success rate over submitted values, where a blank value counts as unfilled.
pub fn completion_rate(values: &FieldValues) -> f64 {
    let filled = values.values().filter(|v| !v.trim().is_empty()).count();
    success_rate(filled, values.len())
}

#[derive(Clone)]
pub struct LearningLoop {
    store: Arc<dyn PreferenceStore>,
    synonyms: Arc<SynonymTable>,
}

impl LearningLoop {
    pub fn new(store: Arc<dyn PreferenceStore>, synonyms: Arc<SynonymTable>) -> Self {
        Self { store, synonyms }
    }

    /// Stores every non-blank value under its canonical key as one batch.
    pub async fn learn(&self, user_id: Uuid, provided: &FieldValues) -> Result<usize, StoreError> {
        let entries: Vec<(String, String)> = provided
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (self.synonyms.canonicalize(k), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
            .collect();

        if entries.is_empty() {
            return Ok(0);
        }

        let learned = self.store.put_batch(user_id, &entries).await?;
        info!("Learned {learned} preferences for user {user_id}");
        Ok(learned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autofill::matcher::AutoFillMatcher;
    use crate::autofill::profile::UserProfile;
    use crate::forms::models::{FieldType, FormField, FormSchema};
    use crate::platform::PlatformId;
    use crate::testing::{FailingPreferenceStore, InMemoryPreferenceStore};

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn synonyms() -> Arc<SynonymTable> {
        Arc::new(SynonymTable::builtin().unwrap())
    }

    #[test]
    fn test_success_rate_of_empty_form_is_zero() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(3, 4), 75.0);
        assert_eq!(completion_rate(&FieldValues::new()), 0.0);
    }

    #[test]
    fn test_completion_rate_counts_blanks_as_unfilled() {
        let submitted = values(&[("email", "a@b.com"), ("phone", ""), ("city", " ")]);
        let rate = completion_rate(&submitted);
        assert!((rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_learn_skips_blank_values_and_canonicalizes() {
        let store = Arc::new(InMemoryPreferenceStore::default());
        let learning = LearningLoop::new(store.clone(), synonyms());
        let user = Uuid::new_v4();

        let learned = learning
            .learn(user, &values(&[("Phone Number", "555-1234"), ("notes", "   ")]))
            .await
            .unwrap();

        assert_eq!(learned, 1);
        let record = store.get(user).await.unwrap();
        assert_eq!(record.get("phone"), Some("555-1234"));
        assert!(record.get("notes").is_none());
    }

    #[tokio::test]
    async fn test_learned_value_is_used_by_next_fill() {
        let store = Arc::new(InMemoryPreferenceStore::default());
        let learning = LearningLoop::new(store.clone(), synonyms());
        let user = Uuid::new_v4();

        learning
            .learn(user, &values(&[("salaryExpectation", "150000")]))
            .await
            .unwrap();

        let schema = FormSchema::new(
            PlatformId::Lever,
            vec![FormField::new("expected_salary", "Expected Salary", FieldType::Text, false)],
        )
        .unwrap();
        let preferences = store.get(user).await.unwrap();
        let result = AutoFillMatcher.fill(&schema, &UserProfile::default(), &preferences);
        assert_eq!(result.auto_filled_data["expected_salary"], "150000");
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let learning = LearningLoop::new(Arc::new(FailingPreferenceStore), synonyms());
        let err = learning
            .learn(Uuid::new_v4(), &values(&[("email", "a@b.com")]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
