//! Audit orchestration
//!
//! `LoadSubject → Invoke → Parse → Normalize → Persist`. Every run ends in a
//! report or an `AuditFailure`; the stored verdict only changes in `Persist`,
//! and only through one `write_verdict` call.

use std::sync::Arc;
use std::time::Instant;

use aura_store::MarketStore;
use aura_verdict::{NormalizeLimits, Verdict, normalize, parse_verdict};
use serde::Serialize;
use uuid::Uuid;

use crate::client::AuditClient;
use crate::error::{AuditFailure, ErrorCategory};
use crate::prompt::AppMetadata;

/// A persisted verdict and where it went
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub app_id: Uuid,
    pub version_id: Uuid,
    #[serde(flatten)]
    pub verdict: Verdict,
    pub model: String,
    pub elapsed_ms: u64,
}

/// Why an audit produced no verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableReason {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Caller-facing result of one audit run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuditOutcome {
    Success(AuditReport),
    Unavailable(UnavailableReason),
    NotFound(String),
    PersistFailed(String),
}

impl AuditOutcome {
    pub fn from_result(result: Result<AuditReport, AuditFailure>) -> Self {
        match result {
            Ok(report) => Self::Success(report),
            Err(failure) => Self::from_failure(failure),
        }
    }

    fn from_failure(failure: AuditFailure) -> Self {
        match failure {
            AuditFailure::SubjectNotFound { .. } => Self::NotFound(failure.to_string()),
            AuditFailure::PersistFailed { .. } => Self::PersistFailed(failure.to_string()),
            AuditFailure::Remote(_)
            | AuditFailure::MalformedReply { .. }
            | AuditFailure::StoreUnavailable { .. } => Self::Unavailable(UnavailableReason {
                category: failure.category(),
                message: failure.to_string(),
                raw: failure.raw_reply().map(str::to_string),
            }),
        }
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Success(_) => None,
            Self::Unavailable(reason) => Some(reason.category),
            Self::NotFound(_) => Some(ErrorCategory::SubjectNotFound),
            Self::PersistFailed(_) => Some(ErrorCategory::PersistFailed),
        }
    }
}

/// Runs audits against a store. Holds no per-run state; share freely.
#[derive(Clone)]
pub struct AuditOrchestrator {
    store: Arc<dyn MarketStore>,
    client: AuditClient,
    limits: NormalizeLimits,
}

impl AuditOrchestrator {
    pub fn new(store: Arc<dyn MarketStore>, client: AuditClient, limits: NormalizeLimits) -> Self {
        Self {
            store,
            client,
            limits,
        }
    }

    /// Audit the newest version of `app_id`.
    pub async fn run(&self, app_id: Uuid) -> Result<AuditReport, AuditFailure> {
        let started = Instant::now();
        let result = self.run_stages(app_id, started).await;

        if let Err(failure) = &result {
            tracing::warn!(
                app_id = %app_id,
                category = failure.category().as_str(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %failure,
                "audit failed"
            );
            if let Some(raw) = failure.raw_reply() {
                tracing::debug!(app_id = %app_id, raw, "unparseable model reply");
            }
        }

        result
    }

    pub async fn run_outcome(&self, app_id: Uuid) -> AuditOutcome {
        AuditOutcome::from_result(self.run(app_id).await)
    }

    async fn run_stages(&self, app_id: Uuid, started: Instant) -> Result<AuditReport, AuditFailure> {
        // LoadSubject
        let record = self
            .store
            .get_app(app_id)
            .await
            .map_err(|source| AuditFailure::StoreUnavailable { app_id, source })?
            .ok_or(AuditFailure::SubjectNotFound { app_id })?;
        let version = self
            .store
            .latest_version(app_id)
            .await
            .map_err(|source| AuditFailure::StoreUnavailable { app_id, source })?
            .ok_or(AuditFailure::SubjectNotFound { app_id })?;

        tracing::debug!(app_id = %app_id, version_id = %version.id, "audit subject loaded");

        // Invoke
        let reply = self.client.audit(&AppMetadata::from_record(&record)).await?;

        // Parse, Normalize
        let verdict = normalize(parse_verdict(&reply.text)?, &self.limits);

        // Persist
        self.store
            .write_verdict(version.id, &verdict)
            .await
            .map_err(|source| AuditFailure::PersistFailed {
                version_id: version.id,
                source,
            })?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            app_id = %app_id,
            version_id = %version.id,
            score = verdict.score,
            flags = verdict.flags.len(),
            model = %reply.model,
            elapsed_ms,
            "audit complete"
        );

        Ok(AuditReport {
            app_id,
            version_id: version.id,
            verdict,
            model: reply.model,
            elapsed_ms,
        })
    }
}
