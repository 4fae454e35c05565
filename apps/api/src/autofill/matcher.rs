//! Auto-Fill Matcher.
//!
//! Resolution per field is exact-key only: stored preference first, then the
//! profile attribute mapped to the same canonical key. Fuzzy matching happens
//! earlier, when field names are canonicalized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::autofill::preferences::PreferenceRecord;
use crate::autofill::profile::UserProfile;
use crate::forms::models::{FormField, FormSchema};

/// `auto_filled_data` and `missing_fields` partition the schema's fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillResult {
    pub auto_filled_data: BTreeMap<String, String>,
    /// Unresolved field names, in form order.
    pub missing_fields: Vec<String>,
}

impl FillResult {
    pub fn filled_count(&self) -> usize {
        self.auto_filled_data.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AutoFillMatcher;

impl AutoFillMatcher {
    pub fn fill(
        &self,
        schema: &FormSchema,
        profile: &UserProfile,
        preferences: &PreferenceRecord,
    ) -> FillResult {
        let mut result = FillResult::default();

        for field in schema.fields() {
            match resolve(field, profile, preferences) {
                Some(value) => {
                    result.auto_filled_data.insert(field.name.clone(), value);
                }
                None => result.missing_fields.push(field.name.clone()),
            }
        }

        result
    }
}

/// The first non-blank source decides. A value outside a non-empty option
/// list leaves the field unresolved rather than trying the next source.
fn resolve(
    field: &FormField,
    profile: &UserProfile,
    preferences: &PreferenceRecord,
) -> Option<String> {
    let value = preferences
        .get(&field.name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| profile.value_for(&field.name))?;

    if field.options.is_empty() {
        Some(value)
    } else {
        field.matching_option(&value).map(str::to_string)
    }
}
