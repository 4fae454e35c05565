use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::PlatformId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Phone,
    Url,
    Number,
    Date,
    Select,
    Boolean,
    File,
}

/// A single input on an application form. `name` is the canonical key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

impl FormField {
    pub fn new(name: &str, label: &str, field_type: FieldType, required: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            field_type,
            required,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    /// Returns the option spelled the way the form expects it, matching
    /// case-insensitively. `None` when the value is not a valid choice.
    pub fn matching_option(&self, value: &str) -> Option<&str> {
        let value = value.trim();
        self.options
            .iter()
            .find(|o| o.trim().eq_ignore_ascii_case(value))
            .map(String::as_str)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("duplicate field name '{0}' in form schema")]
    DuplicateField(String),

    #[error("form field with an empty name")]
    EmptyName,
}

/// Ordered set of fields extracted from one application form.
///
/// Field names are unique; construction fails otherwise. Deserialization goes
/// through the same check so cached schemas cannot smuggle in duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FormSchemaRepr")]
pub struct FormSchema {
    platform: PlatformId,
    fields: Vec<FormField>,
    required_fields: BTreeSet<String>,
}

#[derive(Deserialize)]
struct FormSchemaRepr {
    platform: PlatformId,
    fields: Vec<FormField>,
}

impl TryFrom<FormSchemaRepr> for FormSchema {
    type Error = SchemaError;

    fn try_from(repr: FormSchemaRepr) -> Result<Self, Self::Error> {
        FormSchema::new(repr.platform, repr.fields)
    }
}

impl FormSchema {
    pub fn new(platform: PlatformId, fields: Vec<FormField>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        let required_fields = fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.clone())
            .collect();
        Ok(Self {
            platform,
            fields,
            required_fields,
        })
    }

    pub fn platform(&self) -> PlatformId {
        self.platform
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> &BTreeSet<String> {
        &self.required_fields
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required_fields.contains(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
