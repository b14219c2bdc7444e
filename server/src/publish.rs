//! Publish flow: validate an upload, store it, audit it in the background
//!
//! Publishing never waits on the audit. A failed or slow audit leaves the
//! version published with a pending verdict.

use aura_audit::AuditOrchestrator;
use aura_store::{Category, MarketStore, NewApp, NewPackage, Platform, StoreError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::json_error;

pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_USERNAME: &str = "developer";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("unknown platform {0:?}")]
    UnknownPlatform(String),

    #[error("package must be an .apk or .ipa file: {0}")]
    UnsupportedPackage(String),

    #[error(".{extension} packages cannot be published for {platform}")]
    PlatformMismatch {
        platform: Platform,
        extension: &'static str,
    },

    #[error("file_size_bytes must not be negative (got {0})")]
    NegativeSize(i64),

    #[error("app not found: {0}")]
    AppNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for PublishError {
    fn into_response(self) -> Response {
        match &self {
            Self::AppNotFound(_) => {
                json_error(StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()).into_response()
            }
            Self::Store(err) => {
                tracing::error!(error = %err, "publish failed in store");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "storage is unavailable",
                )
                .into_response()
            }
            _ => json_error(StatusCode::BAD_REQUEST, "INVALID_UPLOAD", self.to_string())
                .into_response(),
        }
    }
}

/// Body of `POST /api/apps`
#[derive(Debug, Clone, Deserialize)]
pub struct PublishAppRequest {
    pub developer_id: Uuid,
    #[serde(default)]
    pub developer_name: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub file_size_bytes: i64,
    #[serde(default)]
    pub version_string: Option<String>,
}

/// Body of `POST /api/apps/{app_id}/versions`
#[derive(Debug, Clone, Deserialize)]
pub struct PublishVersionRequest {
    #[serde(default)]
    pub version_string: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub file_size_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    pub app_id: Uuid,
    pub version_id: Uuid,
    /// Whether a background audit was started
    pub audit_scheduled: bool,
}

/// Lowercased package extension of a URI, ignoring query and fragment.
pub fn package_extension(uri: &str) -> Option<&'static str> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let (_, extension) = path.rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "apk" => Some("apk"),
        "ipa" => Some("ipa"),
        _ => None,
    }
}

fn required(value: &str, field: &'static str) -> Result<String, PublishError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PublishError::MissingField(field));
    }
    Ok(value.to_string())
}

fn validate_package(
    platform: Platform,
    version_string: &str,
    file_url: &str,
    file_size_bytes: i64,
) -> Result<NewPackage, PublishError> {
    let file_url = required(file_url, "file_url")?;
    let extension = package_extension(&file_url)
        .ok_or_else(|| PublishError::UnsupportedPackage(file_url.clone()))?;
    if !platform.accepts_package(extension) {
        return Err(PublishError::PlatformMismatch {
            platform,
            extension,
        });
    }
    if file_size_bytes < 0 {
        return Err(PublishError::NegativeSize(file_size_bytes));
    }

    Ok(NewPackage::new(
        required(version_string, "version_string")?,
        file_url,
        file_size_bytes,
    ))
}

/// Check an upload and turn it into store inputs.
pub fn validate_app(req: &PublishAppRequest) -> Result<(NewApp, NewPackage), PublishError> {
    let title = required(&req.title, "title")?;
    let description = required(&req.description, "description")?;
    let category = required(&req.category, "category")?;
    let platform = Platform::parse(&req.platform)
        .ok_or_else(|| PublishError::UnknownPlatform(req.platform.clone()))?;
    let icon_url = required(req.icon_url.as_deref().unwrap_or_default(), "icon_url")?;

    let version_string = req.version_string.as_deref().unwrap_or(DEFAULT_VERSION);
    let package = validate_package(platform, version_string, &req.file_url, req.file_size_bytes)?;

    let app = NewApp {
        developer_id: req.developer_id,
        title,
        description,
        category: Category::from_label(&category),
        platform,
        icon_url: Some(icon_url),
        created_at: package.created_at,
    };

    Ok((app, package))
}

/// Store a new app with its first version, then audit it unless disabled.
pub async fn publish_app(
    store: &dyn MarketStore,
    orchestrator: &AuditOrchestrator,
    audit_enabled: bool,
    req: PublishAppRequest,
) -> Result<PublishResponse, PublishError> {
    let (new_app, package) = validate_app(&req)?;

    let username = req
        .developer_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_USERNAME);
    store.ensure_developer(req.developer_id, username).await?;

    let (app, version) = store.publish_app(new_app, package).await?;

    if audit_enabled {
        spawn_audit(orchestrator.clone(), app.id);
    }

    Ok(PublishResponse {
        app_id: app.id,
        version_id: version.id,
        audit_scheduled: audit_enabled,
    })
}

/// Add a version to an existing app, then audit it unless disabled.
pub async fn publish_version(
    store: &dyn MarketStore,
    orchestrator: &AuditOrchestrator,
    audit_enabled: bool,
    app_id: Uuid,
    req: PublishVersionRequest,
) -> Result<PublishResponse, PublishError> {
    let record = store
        .get_app(app_id)
        .await?
        .ok_or(PublishError::AppNotFound(app_id))?;

    let package = validate_package(
        record.app.platform,
        &req.version_string,
        &req.file_url,
        req.file_size_bytes,
    )?;

    let version = store.publish_version(app_id, package).await?;

    if audit_enabled {
        spawn_audit(orchestrator.clone(), app_id);
    }

    Ok(PublishResponse {
        app_id,
        version_id: version.id,
        audit_scheduled: audit_enabled,
    })
}

/// Fire-and-continue audit; the orchestrator logs its own failures.
fn spawn_audit(orchestrator: AuditOrchestrator, app_id: Uuid) {
    tokio::spawn(async move {
        if let Err(failure) = orchestrator.run(app_id).await {
            match failure.verdict_state() {
                Some(state) => tracing::info!(
                    app_id = %app_id,
                    category = failure.category().as_str(),
                    state = ?state,
                    "background audit left the verdict pending"
                ),
                None => tracing::warn!(
                    app_id = %app_id,
                    category = failure.category().as_str(),
                    "background audit did not complete"
                ),
            }
        }
    });
}

/// JSON wrapper for handlers
pub fn created(response: PublishResponse) -> Response {
    (StatusCode::CREATED, Json(response)).into_response()
}
