//! Auto-fill: profile and preference sources, matching, planning, learning.

use std::collections::BTreeMap;

pub mod learning;
pub mod matcher;
pub mod planner;
pub mod preferences;
pub mod profile;

/// Form values keyed by field name. Conversion from loosely typed input
/// happens at the HTTP boundary.
pub type FieldValues = BTreeMap<String, String>;
