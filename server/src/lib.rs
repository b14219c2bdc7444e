//! HTTP surface of the Aura store
//!
//! Wires the SQLite store, the audit orchestrator and the catalog projector
//! behind an axum router. See `routes` for the endpoint table.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod error;
pub mod publish;
pub mod routes;
pub mod state;

pub use config::{AuraConfig, ConfigError};
pub use routes::router;
pub use state::AppState;
