use quiz_core::model::{ChapterId, HistoryEntry, HistoryStore, QuizMode, QuizResult};
use quiz_core::time::fixed_now;
use storage::repository::{HISTORY_KEY, KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;

fn sample_result() -> QuizResult {
    QuizResult {
        correct: 4,
        incorrect: 1,
        total: 5,
        percentage: 80,
        time_spent_secs: 125,
        answers: Vec::new(),
    }
}

#[tokio::test]
async fn sqlite_kv_roundtrip_overwrite_and_remove() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get("missing").await.unwrap(), None);

    repo.set("greeting", "hello").await.unwrap();
    repo.set("greeting", "bonjour").await.unwrap();
    assert_eq!(
        repo.get("greeting").await.unwrap().as_deref(),
        Some("bonjour")
    );

    repo.remove("greeting").await.unwrap();
    repo.remove("greeting").await.unwrap();
    assert_eq!(repo.get("greeting").await.unwrap(), None);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    repo.set("k", "v").await.unwrap();
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn sqlite_storage_persists_history_document() {
    let storage = Storage::sqlite("sqlite:file:memdb_history_doc?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");

    let mut store = HistoryStore::default();
    store.record(HistoryEntry::from_result(
        &sample_result(),
        QuizMode::Practice,
        Some(ChapterId::new(2)),
        fixed_now(),
    ));
    storage.history.save(&store).await.unwrap();

    let loaded = storage.history.load().await.unwrap().expect("document");
    assert_eq!(loaded, store);
    assert_eq!(loaded.latest_practice.unwrap().time_spent_formatted, "02:05");

    storage
        .shuffle_orders
        .save(ChapterId::new(2), &[1, 0])
        .await
        .unwrap();
    storage.history.clear().await.unwrap();

    assert!(storage.kv.get(HISTORY_KEY).await.unwrap().is_none());
    assert_eq!(
        storage.shuffle_orders.load(ChapterId::new(2)).await.unwrap(),
        Some(vec![1, 0])
    );
}
