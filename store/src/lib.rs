//! App and version storage
//!
//! The pipeline talks to storage only through `MarketStore`. Every method is
//! atomic at row granularity; nothing is cached across calls.
//! `SqliteStore` is the shipped implementation.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod error;
pub mod model;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use model::{
    App, AppListing, AppRecord, Category, NewApp, NewPackage, Platform, Profile, Version,
};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use aura_verdict::Verdict;
use uuid::Uuid;

/// Storage interface used by the audit pipeline, the catalog and the HTTP layer
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Create the profile if missing and flag it as a developer.
    async fn ensure_developer(&self, id: Uuid, username: &str) -> Result<Profile>;

    /// Create an app together with its first version, atomically.
    async fn publish_app(&self, app: NewApp, package: NewPackage) -> Result<(App, Version)>;

    /// Add a version to an existing app.
    ///
    /// Fails with `StoreError::NotFound` if the app does not exist.
    async fn publish_version(&self, app_id: Uuid, package: NewPackage) -> Result<Version>;

    /// App with its owner's username.
    async fn get_app(&self, app_id: Uuid) -> Result<Option<AppRecord>>;

    /// Most recently created version of an app.
    async fn latest_version(&self, app_id: Uuid) -> Result<Option<Version>>;

    async fn get_version(&self, version_id: Uuid) -> Result<Option<Version>>;

    /// Overwrite score, summary and flags of a version in one write.
    ///
    /// Fails with `StoreError::NotFound` if the version does not exist.
    async fn write_verdict(&self, version_id: Uuid, verdict: &Verdict) -> Result<()>;

    /// Apps on any of `platforms` with all their versions, read as one snapshot.
    async fn catalog_listings(&self, platforms: &[Platform]) -> Result<Vec<AppListing>>;

    /// Increment the download counter and return the package URI.
    async fn record_download(&self, version_id: Uuid) -> Result<Option<String>>;
}
