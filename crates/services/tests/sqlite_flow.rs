use std::path::PathBuf;

use quiz_core::model::{AnswerOption, ChapterId};
use quiz_core::time::fixed_now;
use services::{AppServices, AppServicesError, Clock};

fn content_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("quiz-services-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("chapter1.json"),
        r#"{
            "1": {"question": "2 + 2?", "A": "3", "B": "4", "C": "5", "D": "22"},
            "2": {"question": "Sky colour?", "A": "green", "B": "red", "C": "blue"}
        }"#,
    )
    .unwrap();
    std::fs::write(dir.join("answers1.json"), r#"{"1": "B", "2": "C"}"#).unwrap();
    dir
}

#[tokio::test]
async fn sqlite_backed_practice_resumes_and_records() {
    let dir = content_dir("resume");
    let db = "sqlite:file:memdb_services_flow?mode=memory&cache=shared";
    let services = AppServices::new_sqlite(db, &dir, Clock::fixed(fixed_now()))
        .await
        .unwrap();
    let chapter = ChapterId::new(1);
    assert_eq!(services.questions().chapter_question_count(chapter), 2);
    assert_eq!(services.questions().chapter_question_count(ChapterId::new(2)), 0);

    let mut flow = services.workflow();
    flow.start_practice(chapter).await.unwrap();
    let (id, key) = flow.with_session(|s| {
        let q = s.current_question().unwrap();
        (q.id().clone(), q.correct_answer())
    });
    flow.answer(&id, key).await.unwrap();
    drop(flow);

    let mut resumed = services.workflow();
    resumed.start_practice(chapter).await.unwrap();
    assert_eq!(resumed.with_session(|s| s.answer_for(&id)), Some(key));

    let other = resumed.with_session(|s| {
        s.questions()
            .iter()
            .find(|q| q.id() != &id)
            .unwrap()
            .id()
            .clone()
    });
    resumed.answer(&other, AnswerOption::A).await.unwrap();
    let done = resumed.complete().await.unwrap();
    assert_eq!(done.result.correct, 1);
    assert_eq!(done.result.percentage, 50);

    let entry = done.entry.unwrap();
    assert_eq!(entry.time_spent_formatted, "00:00");
    assert_eq!(services.history().find_entry(&entry.id).await, Some(entry));

    services.history().clear_all().await.unwrap();
    assert!(services.history().load().await.is_empty());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn missing_content_directory_is_reported() {
    let dir = std::env::temp_dir().join("quiz-services-no-such-content");
    let err = AppServices::new_sqlite("sqlite::memory:", &dir, Clock::system())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AppServicesError::ContentDirMissing(path) if path == dir));
}
