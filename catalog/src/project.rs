//! Listings to AltStore document
//!
//! Pure and total: no I/O, and no listing can make projection fail. Bad field
//! values are coerced, never dropped.

use std::cmp::Ordering;

use aura_store::{App, AppListing, Category, Platform, Version};
use aura_verdict::truncate_chars;
use uuid::Uuid;

use crate::document::{CatalogApp, CatalogDocument, CatalogVersion, SourceInfo};

pub const BUNDLE_PREFIX: &str = "com.aura.store";
pub const UNKNOWN_DEVELOPER: &str = "Unknown";
pub const BUILD_VERSION: &str = "1";

/// Installer-facing category for a store category
pub fn map_category(category: Category) -> &'static str {
    match category {
        Category::Productivity => "utilities",
        Category::Games => "games",
        Category::Social => "social",
        Category::Entertainment => "entertainment",
        Category::Utilities => "utilities",
        Category::Education => "other",
        Category::Other => "other",
    }
}

/// `com.aura.store.<32 hex digits>`; distinct apps get distinct identifiers.
pub fn external_identifier(app_id: Uuid) -> String {
    format!("{BUNDLE_PREFIX}.{}", app_id.simple())
}

/// Build the feed for installers on `platform` (`None` lists everything).
pub fn project(
    listings: &[AppListing],
    platform: Option<Platform>,
    source: &SourceInfo,
) -> CatalogDocument {
    let visible = platform.unwrap_or(Platform::Both).visible_platforms();

    let mut selected: Vec<&AppListing> = listings
        .iter()
        .filter(|listing| visible.contains(&listing.app.platform))
        .collect();
    selected.sort_by(|a, b| newest_first(&a.app, &b.app));

    let apps: Vec<CatalogApp> = selected
        .into_iter()
        .map(|listing| project_app(listing, source))
        .collect();

    tracing::debug!(
        platform = ?platform,
        listings = listings.len(),
        apps = apps.len(),
        "catalog projected"
    );

    CatalogDocument {
        name: source.name.clone(),
        identifier: source.identifier.clone(),
        subtitle: source.subtitle.clone(),
        description: source.description.clone(),
        apps,
        news: Vec::new(),
    }
}

fn project_app(listing: &AppListing, source: &SourceInfo) -> CatalogApp {
    let app = &listing.app;

    let mut versions: Vec<&Version> = listing.versions.iter().collect();
    versions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let developer_name = listing
        .developer_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_DEVELOPER);

    CatalogApp {
        name: app.title.clone(),
        bundle_identifier: external_identifier(app.id),
        developer_name: developer_name.to_string(),
        subtitle: truncate_chars(&app.description, source.subtitle_chars).to_string(),
        localized_description: app.description.clone(),
        icon_url: app.icon_url.clone().unwrap_or_default(),
        category: map_category(app.category).to_string(),
        versions: versions.into_iter().map(project_version).collect(),
    }
}

fn project_version(version: &Version) -> CatalogVersion {
    CatalogVersion {
        version: version.version_string.clone(),
        build_version: BUILD_VERSION.to_string(),
        date: version.created_at.format("%Y-%m-%d").to_string(),
        download_url: version.file_url.clone(),
        size: u64::try_from(version.file_size_bytes).unwrap_or(0),
    }
}

fn newest_first(a: &App, b: &App) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}
