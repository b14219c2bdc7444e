//! AltStore source feed for the Aura catalog
//!
//! `project()` turns store listings into a `CatalogDocument`; `to_json()`
//! renders it. The same listings always render to the same bytes. The feed
//! carries no safety data.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod document;
pub mod project;

pub use document::{CatalogApp, CatalogDocument, CatalogVersion, SourceInfo};
pub use project::{external_identifier, map_category, project};

/// Serialize a document as compact JSON.
pub fn to_json(document: &CatalogDocument) -> serde_json::Result<String> {
    serde_json::to_string(document)
}
