//! Canonical field keys.
//!
//! Every field name, label and preference key goes through `normalize_key`, and
//! the synonym table folds the normalized aliases of one semantic field onto a
//! single canonical key. Matching downstream is then exact-key only.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

const DEFAULT_SYNONYMS: &str = include_str!("../../config/synonyms.yaml");

/// Splits camelCase, lower-cases, and collapses every run of non-alphanumeric
/// characters into a single `_`. Idempotent.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev: Option<char> = None;
    let mut pending_sep = false;

    for c in raw.chars() {
        if !c.is_alphanumeric() {
            pending_sep = true;
            prev = None;
            continue;
        }
        if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_numeric()) {
            pending_sep = true;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.extend(c.to_lowercase());
        prev = Some(c);
    }
    out
}

#[derive(Debug, Error)]
pub enum SynonymError {
    #[error("failed to read synonym table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed synonym table: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("alias '{alias}' maps to both '{first}' and '{second}'")]
    Conflict {
        alias: String,
        first: String,
        second: String,
    },

    #[error("canonical key '{0}' normalizes to an empty string")]
    EmptyKey(String),
}

#[derive(Debug, Deserialize)]
struct SynonymFile {
    version: u32,
    fields: BTreeMap<String, Vec<String>>,
}

/// Alias → canonical key lookup, loaded from versioned YAML.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    version: u32,
    aliases: HashMap<String, String>,
}

impl SynonymTable {
    /// The table shipped with the binary.
    pub fn builtin() -> Result<Self, SynonymError> {
        Self::from_yaml(DEFAULT_SYNONYMS)
    }

    pub fn from_path(path: &Path) -> Result<Self, SynonymError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SynonymError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_yaml(&raw)?;
        info!(
            "Loaded synonym table v{} from {} ({} aliases)",
            table.version,
            path.display(),
            table.aliases.len()
        );
        Ok(table)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, SynonymError> {
        let file: SynonymFile = serde_yaml::from_str(raw)?;
        let mut aliases: HashMap<String, String> = HashMap::new();

        for (canonical, names) in &file.fields {
            let key = normalize_key(canonical);
            if key.is_empty() {
                return Err(SynonymError::EmptyKey(canonical.clone()));
            }
            for alias in std::iter::once(canonical).chain(names.iter()) {
                let alias = normalize_key(alias);
                if alias.is_empty() {
                    continue;
                }
                match aliases.get(&alias) {
                    Some(existing) if *existing != key => {
                        return Err(SynonymError::Conflict {
                            alias,
                            first: existing.clone(),
                            second: key,
                        });
                    }
                    Some(_) => {}
                    None => {
                        aliases.insert(alias, key.clone());
                    }
                }
            }
        }

        // A canonical key that is someone else's alias would make
        // canonicalization non-idempotent.
        for key in file.fields.keys().map(|k| normalize_key(k)) {
            if let Some(target) = aliases.get(&key) {
                if *target != key {
                    return Err(SynonymError::Conflict {
                        alias: key.clone(),
                        first: target.clone(),
                        second: key,
                    });
                }
            }
        }

        Ok(Self {
            version: file.version,
            aliases,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Canonical key for a known alias, `None` otherwise.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.aliases.get(&normalize_key(raw)).map(String::as_str)
    }

    /// Canonical key if known, else the normalized input.
    pub fn canonicalize(&self, raw: &str) -> String {
        let normalized = normalize_key(raw);
        match self.aliases.get(&normalized) {
            Some(canonical) => canonical.clone(),
            None => normalized,
        }
    }
}
