//! Store domain types

use aura_verdict::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Target platform of an app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    Android,
    Ios,
    Both,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Android, Platform::Ios, Platform::Both];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Android => "ANDROID",
            Self::Ios => "IOS",
            Self::Both => "BOTH",
        }
    }

    /// Parse from the stored representation (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ANDROID" => Some(Self::Android),
            "IOS" => Some(Self::Ios),
            "BOTH" => Some(Self::Both),
            _ => None,
        }
    }

    /// Stored platforms an installer for `self` can list.
    ///
    /// `Both` as a filter means "no filter".
    pub fn visible_platforms(self) -> &'static [Platform] {
        match self {
            Self::Ios => &[Platform::Ios, Platform::Both],
            Self::Android => &[Platform::Android, Platform::Both],
            Self::Both => &Self::ALL,
        }
    }

    /// Package file extension installable on this platform
    pub fn accepts_package(self, extension: &str) -> bool {
        match self {
            Self::Android => extension == "apk",
            Self::Ios => extension == "ipa",
            Self::Both => extension == "apk" || extension == "ipa",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store category. Unknown stored labels read back as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Productivity,
    Games,
    Social,
    Entertainment,
    Education,
    Utilities,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Productivity => "Productivity",
            Self::Games => "Games",
            Self::Social => "Social",
            Self::Entertainment => "Entertainment",
            Self::Education => "Education",
            Self::Utilities => "Utilities",
            Self::Other => "Other",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "productivity" => Self::Productivity,
            "games" => Self::Games,
            "social" => Self::Social,
            "entertainment" => Self::Entertainment,
            "education" => Self::Education,
            "utilities" => Self::Utilities,
            _ => Self::Other,
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user profile; only developers own apps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub is_developer: bool,
}

/// A published app
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct App {
    pub id: Uuid,
    pub developer_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub platform: Platform,
    pub icon_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An app joined with its owner's display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppRecord {
    #[serde(flatten)]
    pub app: App,
    pub developer_name: Option<String>,
}

/// One uploaded package of an app
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub id: Uuid,
    pub app_id: Uuid,
    pub version_string: String,
    pub file_url: String,
    pub file_size_bytes: i64,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
    /// `None` until an audit completes
    pub verdict: Option<Verdict>,
}

/// Everything the catalog needs about one app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppListing {
    pub app: App,
    pub developer_name: Option<String>,
    pub versions: Vec<Version>,
}

/// Input for creating an app
#[derive(Debug, Clone)]
pub struct NewApp {
    pub developer_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub platform: Platform,
    pub icon_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a version
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub version_string: String,
    pub file_url: String,
    pub file_size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl NewPackage {
    pub fn new(version_string: impl Into<String>, file_url: impl Into<String>, size: i64) -> Self {
        Self {
            version_string: version_string.into(),
            file_url: file_url.into(),
            file_size_bytes: size,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_roundtrip() {
        for p in Platform::ALL {
            assert_eq!(Platform::parse(p.as_str()), Some(p));
        }
        assert_eq!(Platform::parse("ios"), Some(Platform::Ios));
        assert_eq!(Platform::parse("windows"), None);
    }

    #[test]
    fn test_visible_platforms() {
        assert_eq!(
            Platform::Ios.visible_platforms(),
            &[Platform::Ios, Platform::Both]
        );
        assert_eq!(
            Platform::Android.visible_platforms(),
            &[Platform::Android, Platform::Both]
        );
        assert_eq!(Platform::Both.visible_platforms().len(), 3);
    }

    #[test]
    fn test_platform_package_extensions() {
        assert!(Platform::Ios.accepts_package("ipa"));
        assert!(!Platform::Ios.accepts_package("apk"));
        assert!(Platform::Android.accepts_package("apk"));
        assert!(Platform::Both.accepts_package("ipa"));
        assert!(!Platform::Both.accepts_package("exe"));
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::from_label("Games"), Category::Games);
        assert_eq!(Category::from_label(" social "), Category::Social);
        assert_eq!(Category::from_label("Finance"), Category::Other);
        let json = serde_json::to_string(&Category::Productivity).expect("serialize");
        assert_eq!(json, "\"Productivity\"");
        let back: Category = serde_json::from_str("\"Weather\"").expect("deserialize");
        assert_eq!(back, Category::Other);
    }

    #[test]
    fn test_platform_serde() {
        let json = serde_json::to_string(&Platform::Ios).expect("serialize");
        assert_eq!(json, "\"IOS\"");
    }
}
