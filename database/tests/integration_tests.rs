//! Integration tests against file backed SQLite databases
//!
//! Each test creates its own database file in the temp directory so pooled
//! connections see the same data, which in-memory databases cannot offer.

use std::path::PathBuf;

use database::{accounts, tags, DatabaseConfig, ReplayDatabase};
use uuid::Uuid;

struct TempDatabase {
    path: PathBuf,
    db: ReplayDatabase,
}

impl TempDatabase {
    async fn new() -> Self {
        let path = std::env::temp_dir().join(format!("replays-{}.db", Uuid::new_v4()));
        let config = DatabaseConfig::from_cli_or_env_or_yaml(
            Some(format!("sqlite://{}", path.display())),
            None,
        );
        let db = ReplayDatabase::connect(&config)
            .await
            .expect("Failed to create database file");
        Self { path, db }
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

/// Test that file databases are created, migrated and use WAL
#[tokio::test]
async fn test_file_database_uses_wal() {
    let temp = TempDatabase::new().await;

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(temp.db.pool())
        .await
        .expect("Failed to read journal mode");
    assert_eq!(mode.to_lowercase(), "wal");
    assert_eq!(temp.db.replay_count().await.unwrap(), 0);

    // migrations are idempotent
    temp.db.run_migrations().await.expect("Failed to rerun migrations");
}

/// Test that concurrent find-or-create of one tag yields a single row
#[tokio::test]
async fn test_concurrent_tag_creation() {
    let temp = TempDatabase::new().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let db = temp.db.clone();
        let name = if i % 2 == 0 { "Tourney" } else { "tourney" };
        handles.push(tokio::spawn(async move {
            let mut conn = db.pool().acquire().await.expect("Failed to acquire");
            tags::get_or_create_tag(&mut conn, name).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().expect("Failed to create tag").id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(temp.db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

/// Test that placeholder ids stay unique across concurrent transactions
#[tokio::test]
async fn test_concurrent_placeholder_ids() {
    let temp = TempDatabase::new().await;

    let mut handles = Vec::new();
    for i in 0..6 {
        let db = temp.db.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = db.begin().await.expect("Failed to begin");
            let id = accounts::allocate_placeholder_id(&mut tx).await?;
            accounts::get_or_create_account(&mut tx, id, "", &format!("anon{i}")).await?;
            tx.commit()
                .await
                .map_err(|e| database::DatabaseError::Transaction(e.to_string()))?;
            Ok::<_, database::DatabaseError>(id)
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().expect("Failed to allocate"));
    }
    ids.sort_unstable();
    assert_eq!(ids, vec![-6, -5, -4, -3, -2, -1]);
}
