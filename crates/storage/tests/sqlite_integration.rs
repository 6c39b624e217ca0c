use std::collections::BTreeSet;
use std::sync::Arc;

use quiz_core::model::{OptionKey, QuestionId};
use storage::progress::ProgressRepository;
use storage::repository::{ProgressKey, ProgressStore, Storage, StorageError};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_round_trips_every_progress_entry() {
    let repo = connect("memdb_progress_roundtrip").await;
    let progress = ProgressRepository::new(Arc::new(repo));

    let answered: BTreeSet<_> = [QuestionId::new("q1"), QuestionId::new("q2")]
        .into_iter()
        .collect();
    progress.save_answered_ids(&answered).await.unwrap();
    progress.save_score(2).await.unwrap();
    progress.save_advanced(3, &QuestionId::new("q3")).await.unwrap();
    progress
        .save_selected_option(Some(&OptionKey::new("C")))
        .await
        .unwrap();

    assert_eq!(progress.load_answered_ids().await.unwrap(), Some(answered));
    assert_eq!(progress.load_score().await.unwrap(), Some(2));
    assert_eq!(progress.load_question_index().await.unwrap(), Some(3));
    assert_eq!(
        progress.load_current_question_id().await.unwrap(),
        Some(QuestionId::new("q3"))
    );
    assert_eq!(
        progress.load_selected_option().await.unwrap(),
        Some(OptionKey::new("C"))
    );
}

#[tokio::test]
async fn sqlite_null_value_reads_as_missing() {
    let repo = connect("memdb_progress_null").await;
    repo.put(ProgressKey::CurrentQuestionId, Some("q1".into()))
        .await
        .unwrap();
    repo.put(ProgressKey::CurrentQuestionId, None).await.unwrap();

    assert_eq!(repo.get(ProgressKey::CurrentQuestionId).await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_reset_restores_defaults() {
    let repo = connect("memdb_progress_reset").await;
    let progress = ProgressRepository::new(Arc::new(repo));

    progress.save_score(9).await.unwrap();
    progress.save_advanced(4, &QuestionId::new("q4")).await.unwrap();
    progress.reset(1).await.unwrap();

    assert_eq!(progress.load_question_index().await.unwrap(), Some(1));
    assert_eq!(progress.load_score().await.unwrap(), None);
    assert_eq!(progress.load_answered_ids().await.unwrap(), None);
    assert_eq!(progress.load_current_question_id().await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_malformed_value_surfaces_as_serialization() {
    let repo = connect("memdb_progress_malformed").await;
    repo.put(ProgressKey::QuestionIndex, Some("three".into()))
        .await
        .unwrap();
    let progress = ProgressRepository::new(Arc::new(repo));

    assert!(matches!(
        progress.load_question_index().await.unwrap_err(),
        StorageError::Serialization(_)
    ));
}

#[tokio::test]
async fn file_database_is_created_in_wal_mode() {
    let path = std::env::temp_dir().join(format!("quiz_progress_{}.sqlite3", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}", path.display());

    let repo = SqliteRepository::open(&url).await.expect("open");
    assert!(path.exists());

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(mode.to_ascii_lowercase(), "wal");
    let busy: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(busy, 5000);

    repo.pool().close().await;
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_progress_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn storage_sqlite_builds_a_progress_store() {
    let storage = Storage::sqlite("sqlite:file:memdb_progress_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage
        .progress
        .put(ProgressKey::Score, Some("1".into()))
        .await
        .unwrap();
    assert_eq!(
        storage.progress.get(ProgressKey::Score).await.unwrap().as_deref(),
        Some("1")
    );
}
