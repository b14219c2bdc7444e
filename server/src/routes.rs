//! HTTP routes
//!
//! | method | path                              | handler           |
//! |--------|-----------------------------------|-------------------|
//! | GET    | `/healthz`                        | `healthz`         |
//! | POST   | `/api/audit`                      | `run_audit`       |
//! | GET    | `/api/audit/models`               | `list_models`     |
//! | GET    | `/api/altstore/source.json`       | `altstore_source` |
//! | GET    | `/api/download/{version_id}`      | `download`        |
//! | POST   | `/api/apps`                       | `create_app`      |
//! | GET    | `/api/apps/{app_id}`              | `app_detail`      |
//! | POST   | `/api/apps/{app_id}/versions`     | `create_version`  |

use aura_audit::{AuditOutcome, ErrorCategory, RemoteFailure};
use aura_catalog::project;
use aura_store::{AppRecord, Platform, Version};
use aura_verdict::{SafetyBadge, VerdictState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, bad_request, json_error, not_found, store_error};
use crate::publish::{self, PublishAppRequest, PublishError, PublishVersionRequest, created};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/audit", post(run_audit))
        .route("/api/audit/models", get(list_models))
        .route("/api/altstore/source.json", get(altstore_source))
        .route("/api/download/{version_id}", get(download))
        .route("/api/apps", post(create_app))
        .route("/api/apps/{app_id}", get(app_detail))
        .route("/api/apps/{app_id}/versions", post(create_version))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| bad_request(format!("{what} must be a UUID")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AuditRequest {
    #[serde(default)]
    app_id: Option<String>,
}

async fn run_audit(
    State(state): State<AppState>,
    req: Result<Json<AuditRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = req.map_err(|_| bad_request("invalid JSON body"))?;
    let raw = req
        .app_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| bad_request("Missing app_id"))?;
    let app_id = parse_id(raw, "app_id")?;

    let outcome = state.orchestrator.run_outcome(app_id).await;
    Ok((outcome_status(&outcome), Json(outcome)).into_response())
}

fn outcome_status(outcome: &AuditOutcome) -> StatusCode {
    match outcome {
        AuditOutcome::Success(_) => StatusCode::OK,
        AuditOutcome::NotFound(_) => StatusCode::NOT_FOUND,
        AuditOutcome::PersistFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AuditOutcome::Unavailable(reason) => match reason.category {
            ErrorCategory::ConfigurationMissing | ErrorCategory::StoreUnavailable => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_GATEWAY,
        },
    }
}

#[derive(Debug, Serialize)]
struct ModelsResponse {
    configured_model: String,
    models: Vec<String>,
}

async fn list_models(State(state): State<AppState>) -> Result<Json<ModelsResponse>, ApiError> {
    match state.models.list_models().await {
        Ok(models) => Ok(Json(ModelsResponse {
            configured_model: state.config.audit.model.clone(),
            models,
        })),
        Err(err @ RemoteFailure::ConfigurationMissing(_)) => Err(json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            err.category().as_str(),
            err.to_string(),
        )),
        Err(err) => Err(json_error(
            StatusCode::BAD_GATEWAY,
            err.category().as_str(),
            err.to_string(),
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog feed and downloads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CatalogQuery {
    platform: Option<String>,
}

async fn altstore_source(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Response, ApiError> {
    let catalog = &state.config.catalog;
    let platform = match query.platform.as_deref() {
        None => catalog.default_platform,
        Some(raw) => Platform::parse(raw)
            .ok_or_else(|| bad_request("platform must be IOS, ANDROID or BOTH"))?,
    };

    let listings = state
        .store
        .catalog_listings(platform.visible_platforms())
        .await
        .map_err(store_error)?;
    let document = project(&listings, Some(platform), &catalog.source_info());

    Ok((
        [(header::CACHE_CONTROL, catalog.cache_control())],
        Json(document),
    )
        .into_response())
}

async fn download(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
) -> Result<Response, ApiError> {
    let version_id = parse_id(&version_id, "version_id")?;
    let file_url = state
        .store
        .record_download(version_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Version not found"))?;

    tracing::debug!(version_id = %version_id, "download redirected");
    Ok((StatusCode::FOUND, [(header::LOCATION, file_url)]).into_response())
}

// ─────────────────────────────────────────────────────────────────────────────
// Apps
// ─────────────────────────────────────────────────────────────────────────────

async fn create_app(
    State(state): State<AppState>,
    req: Result<Json<PublishAppRequest>, JsonRejection>,
) -> Result<Response, Response> {
    let Json(req) = req.map_err(|e| bad_request(e.body_text()).into_response())?;
    let published = publish::publish_app(
        state.store.as_ref(),
        &state.orchestrator,
        state.config.audit.enabled,
        req,
    )
    .await
    .map_err(PublishError::into_response)?;
    Ok(created(published))
}

async fn create_version(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
    req: Result<Json<PublishVersionRequest>, JsonRejection>,
) -> Result<Response, Response> {
    let app_id = parse_id(&app_id, "app_id").map_err(IntoResponse::into_response)?;
    let Json(req) = req.map_err(|e| bad_request(e.body_text()).into_response())?;
    let published = publish::publish_version(
        state.store.as_ref(),
        &state.orchestrator,
        state.config.audit.enabled,
        app_id,
        req,
    )
    .await
    .map_err(PublishError::into_response)?;
    Ok(created(published))
}

#[derive(Debug, Serialize)]
struct AppDetail {
    app: AppRecord,
    latest_version: Option<Version>,
    verdict: VerdictState,
    badge: SafetyBadge,
    badge_label: &'static str,
}

async fn app_detail(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
) -> Result<Json<AppDetail>, ApiError> {
    let app_id = parse_id(&app_id, "app_id")?;
    let app = state
        .store
        .get_app(app_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("App not found"))?;
    let latest_version = state.store.latest_version(app_id).await.map_err(store_error)?;

    let verdict =
        VerdictState::from_stored(latest_version.as_ref().and_then(|v| v.verdict.clone()));
    let badge = verdict.badge();

    Ok(Json(AppDetail {
        app,
        latest_version,
        verdict,
        badge,
        badge_label: badge.label(),
    }))
}
