//! SQLite-backed `MarketStore`
//!
//! Connections come from an r2d2 pool; every call runs on the blocking thread
//! pool via `spawn_blocking` so SQLite never stalls async workers.
//!
//! Timestamps are stored as fixed-width RFC 3339 (microseconds, `Z`) so text
//! ordering in SQL matches chronological ordering.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aura_verdict::Verdict;
use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params, params_from_iter};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{
    App, AppListing, AppRecord, Category, NewApp, NewPackage, Platform, Profile, Version,
};
use crate::MarketStore;

/// Embedded schema SQL
const SCHEMA_SQL: &str = include_str!("../STORE_SCHEMA.sql");

const DEFAULT_POOL_SIZE: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const APP_COLUMNS: &str = "a.id, a.developer_id, a.title, a.description, a.category, \
     a.platform, a.icon_url, a.created_at, p.username";

const VERSION_COLUMNS: &str = "v.id, v.app_id, v.version_string, v.file_url, \
     v.file_size_bytes, v.download_count, v.created_at, \
     v.ai_safety_score, v.ai_safety_summary, v.ai_safety_flags";

/// SQLite store over a connection pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.pragma_update(None, "foreign_keys", true)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            let _mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            Ok(())
        });
        let pool = Pool::builder().max_size(DEFAULT_POOL_SIZE).build(manager)?;
        Self::apply_schema(&pool)?;

        tracing::debug!(path = %path.display(), "store opened");

        Ok(Self { pool })
    }

    /// In-memory database on a single pooled connection (tests, demos)
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.pragma_update(None, "foreign_keys", true));
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Self::apply_schema(&pool)?;
        Ok(Self { pool })
    }

    fn apply_schema(pool: &Pool<SqliteConnectionManager>) -> Result<()> {
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Run a synchronous closure against a pooled connection off the async runtime
    async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl MarketStore for SqliteStore {
    async fn ensure_developer(&self, id: Uuid, username: &str) -> Result<Profile> {
        let username = username.to_string();
        self.with_connection(move |conn| {
            conn.execute(
                r#"
                INSERT INTO profiles (id, username, is_developer)
                VALUES (?1, ?2, 1)
                ON CONFLICT(id) DO UPDATE SET is_developer = 1
                "#,
                params![id.to_string(), username],
            )?;

            let profile = conn.query_row(
                "SELECT id, username, is_developer FROM profiles WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(Profile {
                        id: uuid_column(row, 0)?,
                        username: row.get(1)?,
                        is_developer: row.get(2)?,
                    })
                },
            )?;
            Ok(profile)
        })
        .await
    }

    async fn publish_app(&self, app: NewApp, package: NewPackage) -> Result<(App, Version)> {
        self.with_connection(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let app = App {
                id: Uuid::new_v4(),
                developer_id: app.developer_id,
                title: app.title,
                description: app.description,
                category: app.category,
                platform: app.platform,
                icon_url: app.icon_url,
                created_at: app.created_at,
            };
            tx.execute(
                r#"
                INSERT INTO apps
                    (id, developer_id, title, description, category, platform, icon_url, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    app.id.to_string(),
                    app.developer_id.to_string(),
                    app.title,
                    app.description,
                    app.category.as_str(),
                    app.platform.as_str(),
                    app.icon_url,
                    ts_to_sql(&app.created_at),
                ],
            )?;

            let version = insert_version(&tx, app.id, package)?;
            tx.commit()?;

            tracing::info!(
                app_id = %app.id,
                version_id = %version.id,
                platform = %app.platform,
                "app published"
            );

            Ok((app, version))
        })
        .await
    }

    async fn publish_version(&self, app_id: Uuid, package: NewPackage) -> Result<Version> {
        self.with_connection(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let exists = tx
                .query_row(
                    "SELECT 1 FROM apps WHERE id = ?1",
                    params![app_id.to_string()],
                    |_| Ok(()),
                )
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::not_found("app", app_id));
            }

            let version = insert_version(&tx, app_id, package)?;
            tx.commit()?;

            tracing::info!(app_id = %app_id, version_id = %version.id, "version published");
            Ok(version)
        })
        .await
    }

    async fn get_app(&self, app_id: Uuid) -> Result<Option<AppRecord>> {
        self.with_connection(move |conn| {
            let sql = format!(
                "SELECT {APP_COLUMNS} FROM apps a \
                 LEFT JOIN profiles p ON p.id = a.developer_id \
                 WHERE a.id = ?1"
            );
            let record = conn
                .query_row(&sql, params![app_id.to_string()], app_record_from_row)
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn latest_version(&self, app_id: Uuid) -> Result<Option<Version>> {
        self.with_connection(move |conn| {
            let sql = format!(
                "SELECT {VERSION_COLUMNS} FROM app_versions v \
                 WHERE v.app_id = ?1 \
                 ORDER BY v.created_at DESC, v.id ASC \
                 LIMIT 1"
            );
            let version = conn
                .query_row(&sql, params![app_id.to_string()], version_from_row)
                .optional()?;
            Ok(version)
        })
        .await
    }

    async fn get_version(&self, version_id: Uuid) -> Result<Option<Version>> {
        self.with_connection(move |conn| {
            let sql = format!("SELECT {VERSION_COLUMNS} FROM app_versions v WHERE v.id = ?1");
            let version = conn
                .query_row(&sql, params![version_id.to_string()], version_from_row)
                .optional()?;
            Ok(version)
        })
        .await
    }

    async fn write_verdict(&self, version_id: Uuid, verdict: &Verdict) -> Result<()> {
        let score = i64::from(verdict.score);
        let summary = verdict.summary.clone();
        let flags = encode_flags(&verdict.flags);

        self.with_connection(move |conn| {
            let updated = conn.execute(
                r#"
                UPDATE app_versions
                SET ai_safety_score = ?2,
                    ai_safety_summary = ?3,
                    ai_safety_flags = ?4
                WHERE id = ?1
                "#,
                params![version_id.to_string(), score, summary, flags],
            )?;

            if updated == 0 {
                return Err(StoreError::not_found("version", version_id));
            }

            tracing::debug!(version_id = %version_id, score, "verdict written");
            Ok(())
        })
        .await
    }

    async fn catalog_listings(&self, platforms: &[Platform]) -> Result<Vec<AppListing>> {
        if platforms.is_empty() {
            return Ok(Vec::new());
        }
        let platforms: Vec<&'static str> = platforms.iter().copied().map(Platform::as_str).collect();

        self.with_connection(move |conn| {
            // One read transaction so apps and versions come from the same snapshot.
            let tx = conn.transaction()?;
            let placeholders = vec!["?"; platforms.len()].join(", ");

            let app_sql = format!(
                "SELECT {APP_COLUMNS} FROM apps a \
                 LEFT JOIN profiles p ON p.id = a.developer_id \
                 WHERE a.platform IN ({placeholders}) \
                 ORDER BY a.created_at DESC, a.id ASC"
            );
            let records = {
                let mut stmt = tx.prepare(&app_sql)?;
                let rows = stmt.query_map(params_from_iter(platforms.iter()), app_record_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };

            let version_sql = format!(
                "SELECT {VERSION_COLUMNS} FROM app_versions v \
                 JOIN apps a ON a.id = v.app_id \
                 WHERE a.platform IN ({placeholders}) \
                 ORDER BY v.created_at DESC, v.id ASC"
            );
            let mut versions_by_app: HashMap<Uuid, Vec<Version>> = HashMap::new();
            {
                let mut stmt = tx.prepare(&version_sql)?;
                let rows = stmt.query_map(params_from_iter(platforms.iter()), version_from_row)?;
                for version in rows {
                    let version = version?;
                    versions_by_app.entry(version.app_id).or_default().push(version);
                }
            }
            tx.commit()?;

            let listings = records
                .into_iter()
                .map(|record| {
                    let versions = versions_by_app.remove(&record.app.id).unwrap_or_default();
                    AppListing {
                        app: record.app,
                        developer_name: record.developer_name,
                        versions,
                    }
                })
                .collect();
            Ok(listings)
        })
        .await
    }

    async fn record_download(&self, version_id: Uuid) -> Result<Option<String>> {
        self.with_connection(move |conn| {
            let file_url = conn
                .query_row(
                    r#"
                    UPDATE app_versions
                    SET download_count = download_count + 1
                    WHERE id = ?1
                    RETURNING file_url
                    "#,
                    params![version_id.to_string()],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(file_url)
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn insert_version(conn: &Connection, app_id: Uuid, package: NewPackage) -> Result<Version> {
    let version = Version {
        id: Uuid::new_v4(),
        app_id,
        version_string: package.version_string,
        file_url: package.file_url,
        file_size_bytes: package.file_size_bytes,
        download_count: 0,
        created_at: package.created_at,
        verdict: None,
    };

    conn.execute(
        r#"
        INSERT INTO app_versions
            (id, app_id, version_string, file_url, file_size_bytes, download_count, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
        "#,
        params![
            version.id.to_string(),
            app_id.to_string(),
            version.version_string,
            version.file_url,
            version.file_size_bytes,
            ts_to_sql(&version.created_at),
        ],
    )?;

    Ok(version)
}

fn app_record_from_row(row: &Row<'_>) -> rusqlite::Result<AppRecord> {
    let platform: String = row.get(5)?;
    let platform = Platform::parse(&platform).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("unknown platform {platform}").into(),
        )
    })?;

    let app = App {
        id: uuid_column(row, 0)?,
        developer_id: uuid_column(row, 1)?,
        title: row.get(2)?,
        description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        category: Category::from_label(&row.get::<_, String>(4)?),
        platform,
        icon_url: row.get(6)?,
        created_at: ts_from_sql(&row.get::<_, String>(7)?),
    };

    Ok(AppRecord {
        app,
        developer_name: row.get(8)?,
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<Version> {
    let score: Option<i64> = row.get(7)?;
    let summary: Option<String> = row.get(8)?;
    let flags: Option<String> = row.get(9)?;

    let verdict = score.map(|score| {
        Verdict::new(
            score,
            summary.unwrap_or_default(),
            decode_flags(flags.as_deref()),
        )
    });

    Ok(Version {
        id: uuid_column(row, 0)?,
        app_id: uuid_column(row, 1)?,
        version_string: row.get(2)?,
        file_url: row.get(3)?,
        file_size_bytes: row.get(4)?,
        download_count: row.get(5)?,
        created_at: ts_from_sql(&row.get::<_, String>(6)?),
        verdict,
    })
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn ts_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Unparseable timestamps read back as the epoch so one bad row cannot fail a listing.
fn ts_from_sql(raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "unparseable timestamp in store");
            DateTime::<Utc>::UNIX_EPOCH
        }
    }
}

fn encode_flags(flags: &[String]) -> String {
    serde_json::to_string(flags).unwrap_or_else(|_| "[]".to_string())
}

fn decode_flags(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0)
            .single()
            .expect("valid timestamp")
    }

    fn new_app(developer_id: Uuid, title: &str, platform: Platform, secs: i64) -> NewApp {
        NewApp {
            developer_id,
            title: title.to_string(),
            description: format!("{title} description"),
            category: Category::Productivity,
            platform,
            icon_url: Some(format!("https://cdn.example/{title}.png")),
            created_at: at(secs),
        }
    }

    fn package(version: &str, secs: i64) -> NewPackage {
        NewPackage {
            version_string: version.to_string(),
            file_url: format!("https://cdn.example/{version}.ipa"),
            file_size_bytes: 1024,
            created_at: at(secs),
        }
    }

    async fn store_with_developer() -> (SqliteStore, Uuid) {
        let store = SqliteStore::open_in_memory().expect("open");
        let dev = Uuid::new_v4();
        store.ensure_developer(dev, "alice").await.expect("developer");
        (store, dev)
    }

    #[tokio::test]
    async fn test_ensure_developer_is_idempotent() {
        let store = SqliteStore::open_in_memory().expect("open");
        let id = Uuid::new_v4();

        let first = store.ensure_developer(id, "alice").await.expect("first");
        let second = store.ensure_developer(id, "renamed").await.expect("second");

        assert!(first.is_developer);
        assert_eq!(second.username, "alice");
    }

    #[tokio::test]
    async fn test_publish_and_read_back() {
        let (store, dev) = store_with_developer().await;
        let (app, version) = store
            .publish_app(new_app(dev, "notes", Platform::Ios, 0), package("1.0.0", 0))
            .await
            .expect("publish");

        let record = store.get_app(app.id).await.expect("get").expect("exists");
        assert_eq!(record.app, app);
        assert_eq!(record.developer_name.as_deref(), Some("alice"));

        let latest = store
            .latest_version(app.id)
            .await
            .expect("latest")
            .expect("exists");
        assert_eq!(latest, version);
        assert!(latest.verdict.is_none());
    }

    #[tokio::test]
    async fn test_publish_requires_known_developer() {
        let store = SqliteStore::open_in_memory().expect("open");
        let result = store
            .publish_app(
                new_app(Uuid::new_v4(), "orphan", Platform::Ios, 0),
                package("1.0.0", 0),
            )
            .await;
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
    }

    #[tokio::test]
    async fn test_latest_version_orders_by_creation_then_id() {
        let (store, dev) = store_with_developer().await;
        let (app, _) = store
            .publish_app(new_app(dev, "game", Platform::Android, 0), package("1.0.0", 0))
            .await
            .expect("publish");

        let newer = store
            .publish_version(app.id, package("1.1.0", 10))
            .await
            .expect("v2");
        let tied = store
            .publish_version(app.id, package("1.1.1", 10))
            .await
            .expect("v3");
        store
            .publish_version(app.id, package("0.9.0", 5))
            .await
            .expect("v4");

        let latest = store
            .latest_version(app.id)
            .await
            .expect("latest")
            .expect("exists");
        let expected = if newer.id < tied.id { newer.id } else { tied.id };
        assert_eq!(latest.id, expected);
    }

    #[tokio::test]
    async fn test_publish_version_unknown_app() {
        let store = SqliteStore::open_in_memory().expect("open");
        let err = store
            .publish_version(Uuid::new_v4(), package("1.0.0", 0))
            .await
            .expect_err("unknown app");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_write_verdict_overwrites_wholesale() {
        let (store, dev) = store_with_developer().await;
        let (_, version) = store
            .publish_app(new_app(dev, "chat", Platform::Both, 0), package("1.0.0", 0))
            .await
            .expect("publish");

        let first = Verdict {
            score: 20,
            summary: "suspicious".to_string(),
            flags: vec!["phishing".to_string(), "fake reviews".to_string()],
        };
        store.write_verdict(version.id, &first).await.expect("write");

        let second = Verdict {
            score: 90,
            summary: "fine".to_string(),
            flags: vec![],
        };
        store.write_verdict(version.id, &second).await.expect("write");

        let stored = store
            .get_version(version.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(stored.verdict, Some(second));
    }

    #[tokio::test]
    async fn test_write_verdict_unknown_version() {
        let store = SqliteStore::open_in_memory().expect("open");
        let verdict = Verdict::new(50, "x", vec![]);
        let err = store
            .write_verdict(Uuid::new_v4(), &verdict)
            .await
            .expect_err("unknown version");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_catalog_listings_filters_and_groups() {
        let (store, dev) = store_with_developer().await;
        let (ios, _) = store
            .publish_app(new_app(dev, "ios-app", Platform::Ios, 0), package("1.0.0", 0))
            .await
            .expect("ios");
        let (both, _) = store
            .publish_app(new_app(dev, "both-app", Platform::Both, 1), package("2.0.0", 1))
            .await
            .expect("both");
        store
            .publish_app(new_app(dev, "droid", Platform::Android, 2), package("3.0.0", 2))
            .await
            .expect("android");
        store
            .publish_version(ios.id, package("1.1.0", 20))
            .await
            .expect("ios v2");

        let listings = store
            .catalog_listings(Platform::Ios.visible_platforms())
            .await
            .expect("listings");

        let ids: Vec<Uuid> = listings.iter().map(|l| l.app.id).collect();
        assert_eq!(ids, vec![both.id, ios.id]);

        let ios_listing = &listings[1];
        let versions: Vec<&str> = ios_listing
            .versions
            .iter()
            .map(|v| v.version_string.as_str())
            .collect();
        assert_eq!(versions, vec!["1.1.0", "1.0.0"]);
        assert_eq!(ios_listing.developer_name.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_catalog_listings_keeps_versionless_apps() {
        let (store, dev) = store_with_developer().await;
        let app_id = Uuid::new_v4();
        let created = ts_to_sql(&at(0));
        store
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT INTO apps (id, developer_id, title, description, category, platform, created_at) \
                     VALUES (?1, ?2, 'empty', NULL, 'Weather', 'IOS', ?3)",
                    params![app_id.to_string(), dev.to_string(), created],
                )?;
                Ok(())
            })
            .await
            .expect("insert");

        let listings = store
            .catalog_listings(&[Platform::Ios])
            .await
            .expect("listings");
        assert_eq!(listings.len(), 1);
        assert!(listings[0].versions.is_empty());
        assert_eq!(listings[0].app.description, "");
        assert_eq!(listings[0].app.category, Category::Other);
    }

    #[tokio::test]
    async fn test_catalog_listings_empty_filter() {
        let store = SqliteStore::open_in_memory().expect("open");
        let listings = store.catalog_listings(&[]).await.expect("listings");
        assert!(listings.is_empty());
    }

    #[tokio::test]
    async fn test_record_download_increments() {
        let (store, dev) = store_with_developer().await;
        let (_, version) = store
            .publish_app(new_app(dev, "dl", Platform::Ios, 0), package("1.0.0", 0))
            .await
            .expect("publish");

        for _ in 0..3 {
            let url = store
                .record_download(version.id)
                .await
                .expect("download")
                .expect("exists");
            assert_eq!(url, version.file_url);
        }

        let stored = store
            .get_version(version.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(stored.download_count, 3);

        let missing = store
            .record_download(Uuid::new_v4())
            .await
            .expect("download");
        assert!(missing.is_none());
    }

    #[test]
    fn test_timestamp_text_sorts_chronologically() {
        let early = ts_to_sql(&at(0));
        let late = ts_to_sql(&at(3600));
        assert!(early < late);
        assert_eq!(ts_from_sql(&early), at(0));
        assert_eq!(ts_from_sql("garbage"), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_flags_codec() {
        let flags = vec!["a".to_string(), "b \"quoted\"".to_string()];
        assert_eq!(decode_flags(Some(&encode_flags(&flags))), flags);
        assert!(decode_flags(Some("not json")).is_empty());
        assert!(decode_flags(None).is_empty());
    }
}
