//! Audit prompt construction

use aura_store::AppRecord;

/// Fixed system instruction for every audit
pub const SYSTEM_PROMPT: &str = "You are a Mobile App Security Auditor. Analyze the following app metadata. \
Look for signs of scams, phishing, impossible claims (e.g., \"Download more RAM\"), or copyright infringement. \
Return ONLY a valid JSON object with no markdown or extra text: \
{ \"score\": number (0-100, where 100 is perfectly safe), \"summary\": \"Short explanation for the user\", \
\"flags\": [\"list\", \"of\", \"red\", \"flags\"] }. If no issues found, flags can be an empty array.";

pub const UNKNOWN_DEVELOPER: &str = "Unknown";

/// The listing fields shown to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
    pub developer_name: Option<String>,
}

impl AppMetadata {
    pub fn from_record(record: &AppRecord) -> Self {
        Self {
            title: record.app.title.clone(),
            description: record.app.description.clone(),
            category: record.app.category.as_str().to_string(),
            developer_name: record.developer_name.clone(),
        }
    }

    pub fn developer_or_unknown(&self) -> &str {
        self.developer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_DEVELOPER)
    }
}

/// User turn of the audit conversation. Same metadata, same prompt.
pub fn build_user_prompt(meta: &AppMetadata) -> String {
    format!(
        "App metadata to analyze:\n- Title: {}\n- Description: {}\n- Category: {}\n- Developer: {}",
        meta.title,
        meta.description,
        meta.category,
        meta.developer_or_unknown()
    )
}
