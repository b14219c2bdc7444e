//! Server configuration loading
//!
//! Loads configuration from `~/.config/aura/aura.toml` (or `AURA_CONFIG` env).
//! Every key is optional; a missing file means all defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use aura_audit::GeminiConfig;
use aura_audit::gemini::{DEFAULT_API_KEY_ENV, DEFAULT_MODEL, GOOGLE_API_BASE};
use aura_catalog::SourceInfo;
use aura_catalog::document::{
    DEFAULT_SOURCE_DESCRIPTION, DEFAULT_SOURCE_IDENTIFIER, DEFAULT_SOURCE_NAME,
    DEFAULT_SOURCE_SUBTITLE, DEFAULT_SUBTITLE_CHARS,
};
use aura_store::Platform;
use aura_verdict::NormalizeLimits;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuraConfig {
    /// Path to the SQLite database (`~/` is expanded)
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Socket address the HTTP server binds
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub audit: AuditSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,
}

fn default_db_path() -> String {
    dirs::home_dir()
        .map(|h| {
            h.join(".config")
                .join("aura")
                .join("aura.db")
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "aura.db".to_string())
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

/// Model-backed audit settings
#[derive(Debug, Deserialize, Clone)]
pub struct AuditSettings {
    /// Audit new uploads in the background. Manual audits run regardless.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on one model call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_flags")]
    pub max_flags: usize,

    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,

    #[serde(default = "default_max_flag_chars")]
    pub max_flag_chars: usize,
}

fn default_audit_enabled() -> bool {
    true
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_api_base() -> String {
    GOOGLE_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_flags() -> usize {
    NormalizeLimits::default().max_flags
}

fn default_max_summary_chars() -> usize {
    NormalizeLimits::default().max_summary_chars
}

fn default_max_flag_chars() -> usize {
    NormalizeLimits::default().max_flag_chars
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            api_key_env: default_api_key_env(),
            api_base: default_api_base(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_flags: default_max_flags(),
            max_summary_chars: default_max_summary_chars(),
            max_flag_chars: default_max_flag_chars(),
        }
    }
}

/// AltStore feed settings
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogSettings {
    #[serde(default = "default_source_name")]
    pub name: String,

    #[serde(default = "default_source_identifier")]
    pub identifier: String,

    #[serde(default = "default_source_subtitle")]
    pub subtitle: String,

    #[serde(default = "default_source_description")]
    pub description: String,

    /// Characters of an app description used as its subtitle
    #[serde(default = "default_subtitle_chars")]
    pub subtitle_chars: usize,

    /// `Cache-Control: max-age` of the feed response
    #[serde(default = "default_cache_max_age_secs")]
    pub cache_max_age_secs: u64,

    /// Platform served when the request names none
    #[serde(default = "default_platform")]
    pub default_platform: Platform,
}

fn default_source_name() -> String {
    DEFAULT_SOURCE_NAME.to_string()
}

fn default_source_identifier() -> String {
    DEFAULT_SOURCE_IDENTIFIER.to_string()
}

fn default_source_subtitle() -> String {
    DEFAULT_SOURCE_SUBTITLE.to_string()
}

fn default_source_description() -> String {
    DEFAULT_SOURCE_DESCRIPTION.to_string()
}

fn default_subtitle_chars() -> usize {
    DEFAULT_SUBTITLE_CHARS
}

fn default_cache_max_age_secs() -> u64 {
    300
}

fn default_platform() -> Platform {
    Platform::Ios
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            name: default_source_name(),
            identifier: default_source_identifier(),
            subtitle: default_source_subtitle(),
            description: default_source_description(),
            subtitle_chars: default_subtitle_chars(),
            cache_max_age_secs: default_cache_max_age_secs(),
            default_platform: default_platform(),
        }
    }
}

impl CatalogSettings {
    pub fn source_info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name.clone(),
            identifier: self.identifier.clone(),
            subtitle: self.subtitle.clone(),
            description: self.description.clone(),
            subtitle_chars: self.subtitle_chars,
        }
    }

    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age_secs)
    }
}

impl Default for AuraConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            audit: AuditSettings::default(),
            catalog: CatalogSettings::default(),
        }
    }
}

impl AuraConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "AURA_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "aura.toml";

    /// Load configuration from file
    ///
    /// Resolution order:
    /// 1. `AURA_CONFIG` environment variable
    /// 2. `~/.config/aura/aura.toml`
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::resolve_config_path();

        if !path.exists() {
            tracing::info!(
                path = %path.display(),
                "Aura config not found, using defaults"
            );
            let cfg = Self::default();
            cfg.validate()?;
            return Ok(cfg);
        }

        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let cfg: AuraConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("aura"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::DEFAULT_CONFIG_FILENAME)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.audit.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "audit.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.audit.model.trim().is_empty() {
            return Err(ConfigError::Invalid("audit.model must not be empty".to_string()));
        }

        if self.catalog.identifier.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "catalog.identifier must not be empty".to_string(),
            ));
        }

        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "bind_addr {:?} is not a socket address",
                self.bind_addr
            )));
        }

        if self.audit.max_flags == 0 {
            tracing::warn!("audit.max_flags is 0; stored verdicts will carry no flags");
        }

        if self.catalog.subtitle_chars == 0 {
            tracing::warn!("catalog.subtitle_chars is 0; every app subtitle will be empty");
        }

        if !self.audit.api_base.starts_with("https://") && !self.audit.api_base.starts_with("http://")
        {
            tracing::warn!(
                api_base = %self.audit.api_base,
                "audit.api_base is not an http(s) URL; model calls will fail at runtime"
            );
        }

        Ok(())
    }

    /// Get the resolved database path (expanding ~ if needed)
    pub fn resolved_db_path(&self) -> PathBuf {
        let path = &self.db_path;
        if let Some(stripped) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(stripped);
        }
        PathBuf::from(path)
    }

    /// Gemini settings with the API key read from `audit.api_key_env`
    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_base: self.audit.api_base.clone(),
            model: self.audit.model.clone(),
            timeout: Duration::from_secs(self.audit.timeout_secs),
            api_key: None,
        }
        .with_key_from_env(&self.audit.api_key_env)
    }

    pub fn normalize_limits(&self) -> NormalizeLimits {
        NormalizeLimits {
            max_flags: self.audit.max_flags,
            max_summary_chars: self.audit.max_summary_chars,
            max_flag_chars: self.audit.max_flag_chars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AuraConfig::default();
        assert!(cfg.audit.enabled);
        assert_eq!(cfg.bind_addr, "127.0.0.1:3000");
        assert_eq!(cfg.audit.model, "gemini-flash-latest");
        assert_eq!(cfg.audit.timeout_secs, 30);
        assert_eq!(cfg.audit.max_flags, 10);
        assert_eq!(cfg.catalog.default_platform, Platform::Ios);
        assert_eq!(cfg.catalog.cache_control(), "public, max-age=300");
    }

    #[test]
    fn test_parse_empty_config() {
        let cfg = AuraConfig::parse("").expect("should parse");
        assert_eq!(cfg.catalog.identifier, "com.aura.store");
        assert_eq!(cfg.normalize_limits(), NormalizeLimits::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            db_path = "/tmp/aura-test.db"
            bind_addr = "0.0.0.0:8080"

            [audit]
            enabled = false
            api_key_env = "AURA_TEST_GEMINI_KEY"
            api_base = "http://localhost:9999/v1beta/models"
            model = "gemini-pro-latest"
            timeout_secs = 5
            max_flags = 3
            max_summary_chars = 200
            max_flag_chars = 40

            [catalog]
            name = "Staging Store"
            identifier = "com.aura.staging"
            subtitle = "Staging"
            description = "Staging feed"
            subtitle_chars = 40
            cache_max_age_secs = 60
            default_platform = "BOTH"
        "#;

        let cfg = AuraConfig::parse(toml).expect("should parse");
        assert_eq!(cfg.db_path, "/tmp/aura-test.db");
        assert!(!cfg.audit.enabled);
        assert_eq!(cfg.audit.max_flags, 3);
        assert_eq!(cfg.catalog.default_platform, Platform::Both);
        assert_eq!(cfg.catalog.cache_control(), "public, max-age=60");

        let source = cfg.catalog.source_info();
        assert_eq!(source.name, "Staging Store");
        assert_eq!(source.subtitle_chars, 40);

        let gemini = cfg.gemini_config();
        assert_eq!(gemini.model, "gemini-pro-latest");
        assert_eq!(gemini.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = AuraConfig::parse("[audit]\ntimeout_secs = 0\n").expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_empty_identifier_rejected() {
        let err = AuraConfig::parse("[catalog]\nidentifier = \"  \"\n").expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_bind_addr_rejected() {
        let err = AuraConfig::parse("bind_addr = \"localhost\"\n").expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = AuraConfig::parse("db_path = [").expect_err("malformed");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_platform_rejected() {
        assert!(AuraConfig::parse("[catalog]\ndefault_platform = \"WINDOWS\"\n").is_err());
    }

    #[test]
    fn test_resolved_db_path_expands_home() {
        let cfg = AuraConfig {
            db_path: "~/aura/test.db".to_string(),
            ..AuraConfig::default()
        };
        if let Some(home) = dirs::home_dir() {
            assert_eq!(cfg.resolved_db_path(), home.join("aura/test.db"));
        }

        let cfg = AuraConfig {
            db_path: "/var/lib/aura.db".to_string(),
            ..AuraConfig::default()
        };
        assert_eq!(cfg.resolved_db_path(), PathBuf::from("/var/lib/aura.db"));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("aura.toml");
        std::fs::write(&path, "bind_addr = \"127.0.0.1:4000\"\n").expect("write");

        let cfg = AuraConfig::load_from_path(&path).expect("load");
        assert_eq!(cfg.bind_addr, "127.0.0.1:4000");

        let err = AuraConfig::load_from_path(&dir.path().join("missing.toml")).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
