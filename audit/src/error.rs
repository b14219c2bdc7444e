//! Audit failure taxonomy
//!
//! Callers see one `unavailable` outcome for every remote or parse problem,
//! but each failure keeps a machine-readable category for logs and for the
//! reason string stored in `VerdictState::Unavailable`.

use aura_store::StoreError;
use aura_verdict::{ParseFailure, VerdictState};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Machine-readable failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    ConfigurationMissing,
    RemoteUnavailable,
    RemoteRejected,
    MalformedReply,
    SubjectNotFound,
    StoreUnavailable,
    PersistFailed,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigurationMissing => "CONFIGURATION_MISSING",
            Self::RemoteUnavailable => "REMOTE_UNAVAILABLE",
            Self::RemoteRejected => "REMOTE_REJECTED",
            Self::MalformedReply => "MALFORMED_REPLY",
            Self::SubjectNotFound => "SUBJECT_NOT_FOUND",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::PersistFailed => "PERSIST_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of the remote model call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFailure {
    /// No API key or endpoint; not retryable
    #[error("model endpoint not configured: {0}")]
    ConfigurationMissing(String),

    /// Transport failure, timeout, HTTP 5xx or 429
    #[error("model endpoint unavailable: {0}")]
    RemoteUnavailable(String),

    /// The endpoint answered but refused to produce a usable reply
    #[error("model endpoint rejected the request: {message}")]
    RemoteRejected {
        status: Option<u16>,
        message: String,
    },
}

impl RemoteFailure {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationMissing(_) => ErrorCategory::ConfigurationMissing,
            Self::RemoteUnavailable(_) => ErrorCategory::RemoteUnavailable,
            Self::RemoteRejected { .. } => ErrorCategory::RemoteRejected,
        }
    }

    /// Whether a caller-side retry policy may try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }
}

impl From<reqwest::Error> for RemoteFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::RemoteUnavailable(format!("request timed out: {err}"))
        } else {
            Self::RemoteUnavailable(err.to_string())
        }
    }
}

/// Terminal failure of one audit run
#[derive(Debug, Error)]
pub enum AuditFailure {
    #[error("audit unavailable: {0}")]
    Remote(#[from] RemoteFailure),

    #[error("audit unavailable: model reply held no JSON object")]
    MalformedReply { raw: String },

    #[error("nothing to audit for app {app_id}")]
    SubjectNotFound { app_id: Uuid },

    #[error("failed to load app {app_id}: {source}")]
    StoreUnavailable {
        app_id: Uuid,
        #[source]
        source: StoreError,
    },

    #[error("failed to persist verdict for version {version_id}: {source}")]
    PersistFailed {
        version_id: Uuid,
        #[source]
        source: StoreError,
    },
}

impl AuditFailure {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Remote(remote) => remote.category(),
            Self::MalformedReply { .. } => ErrorCategory::MalformedReply,
            Self::SubjectNotFound { .. } => ErrorCategory::SubjectNotFound,
            Self::StoreUnavailable { .. } => ErrorCategory::StoreUnavailable,
            Self::PersistFailed { .. } => ErrorCategory::PersistFailed,
        }
    }

    /// Remote, parse and load failures collapse into the public `unavailable` outcome.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Remote(_) | Self::MalformedReply { .. } | Self::StoreUnavailable { .. }
        )
    }

    /// Raw reply text, when the model answered with something unparseable
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            Self::MalformedReply { raw } => Some(raw.as_str()),
            _ => None,
        }
    }

    /// State a reader should show after this failure, `None` when the
    /// failure says nothing about the verdict (no subject, failed write).
    pub fn verdict_state(&self) -> Option<VerdictState> {
        self.is_unavailable().then(|| VerdictState::Unavailable {
            reason: self.category().as_str().to_string(),
        })
    }
}

impl From<ParseFailure> for AuditFailure {
    fn from(failure: ParseFailure) -> Self {
        match failure {
            ParseFailure::MalformedReply { raw } => Self::MalformedReply { raw },
        }
    }
}
