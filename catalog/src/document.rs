//! AltStore source document types
//!
//! Key names follow the AltStore source format exactly; installers reject
//! documents with renamed keys.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE_NAME: &str = "Aura Store";
pub const DEFAULT_SOURCE_IDENTIFIER: &str = "com.aura.store";
pub const DEFAULT_SOURCE_SUBTITLE: &str = "The Open App Market";
pub const DEFAULT_SOURCE_DESCRIPTION: &str = "Discover and download apps for iOS.";

/// Characters of the description shown as an app's subtitle
pub const DEFAULT_SUBTITLE_CHARS: usize = 80;

/// Source-level metadata, fixed per deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub identifier: String,
    pub subtitle: String,
    pub description: String,
    pub subtitle_chars: usize,
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            name: DEFAULT_SOURCE_NAME.to_string(),
            identifier: DEFAULT_SOURCE_IDENTIFIER.to_string(),
            subtitle: DEFAULT_SOURCE_SUBTITLE.to_string(),
            description: DEFAULT_SOURCE_DESCRIPTION.to_string(),
            subtitle_chars: DEFAULT_SUBTITLE_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub name: String,
    pub identifier: String,
    pub subtitle: String,
    pub description: String,
    pub apps: Vec<CatalogApp>,
    pub news: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogApp {
    pub name: String,
    pub bundle_identifier: String,
    pub developer_name: String,
    pub subtitle: String,
    pub localized_description: String,
    #[serde(rename = "iconURL")]
    pub icon_url: String,
    pub category: String,
    pub versions: Vec<CatalogVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogVersion {
    pub version: String,
    pub build_version: String,
    /// `YYYY-MM-DD`, UTC
    pub date: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    pub size: u64,
}
