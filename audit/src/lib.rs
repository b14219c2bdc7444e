//! Security audit of store listings
//!
//! An audit loads an app and its newest version, asks a language model for a
//! safety verdict, salvages the reply with `aura_verdict`, and stores the
//! verdict against that version.
//!
//! - `AuditClient`: prompt construction and the remote call
//! - `ModelEndpoint`: the remote model seam (`GeminiEndpoint` in production)
//! - `AuditOrchestrator`: load → invoke → parse → normalize → persist

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod client;
pub mod endpoint;
pub mod error;
pub mod gemini;
pub mod orchestrator;
pub mod prompt;

pub use client::{AuditClient, RawReply};
pub use endpoint::{ModelEndpoint, ModelRequest};
pub use error::{AuditFailure, ErrorCategory, RemoteFailure};
pub use gemini::{GeminiConfig, GeminiEndpoint};
pub use orchestrator::{AuditOrchestrator, AuditOutcome, AuditReport, UnavailableReason};
pub use prompt::{AppMetadata, SYSTEM_PROMPT, build_user_prompt};
