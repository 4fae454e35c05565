//! Form Schema Extractor and its supporting pieces.

pub mod cache;
pub mod document;
pub mod extractor;
pub mod models;
pub mod normalize;
pub mod templates;
