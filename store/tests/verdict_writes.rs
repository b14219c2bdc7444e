//! Concurrent verdict writes against an on-disk database
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use aura_store::{Category, MarketStore, NewApp, NewPackage, Platform, SqliteStore};
use aura_verdict::Verdict;
use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

fn candidate(i: u8) -> Verdict {
    Verdict {
        score: i,
        summary: format!("summary {i}"),
        flags: (0..=i % 4).map(|f| format!("flag {i}-{f}")).collect(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_leave_one_complete_verdict() {
    let dir = TempDir::new().expect("tempdir");
    let store = Arc::new(SqliteStore::open(&dir.path().join("aura.db")).expect("open"));

    let dev = Uuid::new_v4();
    store.ensure_developer(dev, "dev").await.expect("developer");
    let (_, version) = store
        .publish_app(
            NewApp {
                developer_id: dev,
                title: "Race".to_string(),
                description: "racing writers".to_string(),
                category: Category::Games,
                platform: Platform::Ios,
                icon_url: None,
                created_at: Utc::now(),
            },
            NewPackage::new("1.0.0", "https://cdn.example/race.ipa", 10),
        )
        .await
        .expect("publish");

    let candidates: Vec<Verdict> = (0..16).map(candidate).collect();
    let mut handles = Vec::new();
    for verdict in candidates.clone() {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.write_verdict(version.id, &verdict).await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("write");
    }

    let stored = store
        .get_version(version.id)
        .await
        .expect("read")
        .expect("version exists")
        .verdict
        .expect("verdict written");

    assert!(
        candidates.contains(&stored),
        "stored verdict {stored:?} is not one of the written candidates"
    );
}

#[tokio::test]
async fn reopening_keeps_data() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("nested").join("aura.db");

    let dev = Uuid::new_v4();
    let version_id = {
        let store = SqliteStore::open(&path).expect("open");
        store.ensure_developer(dev, "dev").await.expect("developer");
        let (_, version) = store
            .publish_app(
                NewApp {
                    developer_id: dev,
                    title: "Persisted".to_string(),
                    description: String::new(),
                    category: Category::Utilities,
                    platform: Platform::Android,
                    icon_url: None,
                    created_at: Utc::now(),
                },
                NewPackage::new("1.0.0", "https://cdn.example/p.apk", 10),
            )
            .await
            .expect("publish");
        version.id
    };

    let store = SqliteStore::open(&path).expect("reopen");
    let version = store
        .get_version(version_id)
        .await
        .expect("read")
        .expect("exists");
    assert_eq!(version.version_string, "1.0.0");
    assert!(version.verdict.is_none());
}
