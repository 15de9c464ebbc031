use chrono::Duration;
use prep_core::model::{
    AttemptResult, Difficulty, MasteryLevel, NewSession, Progress, QuestionId, Session,
    SessionStatus, SessionUpdate, UserId,
};
use prep_core::time::fixed_now;
use storage::repository::{ProgressRepository, SessionRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn user() -> UserId {
    UserId::new("user-1").unwrap()
}

fn build_session(topic: &str) -> Session {
    let spec = NewSession::new(user(), topic, Difficulty::Easy)
        .with_time_limit_mins(30)
        .with_questions(vec![QuestionId::new("two-sum"), QuestionId::new("three-sum")]);
    Session::new(spec, fixed_now()).unwrap()
}

fn attempt(question: &str, is_correct: bool) -> AttemptResult {
    AttemptResult::new(
        QuestionId::new(question),
        is_correct,
        60,
        1,
        0,
        Some("fn solve() {}".into()),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_session_and_children() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let session = build_session("arrays");
    repo.insert_session(&session).await.unwrap();

    let fetched = repo.get_session(session.id()).await.unwrap();
    assert_eq!(fetched, session);
    assert_eq!(fetched.questions().len(), 2);
    assert_eq!(fetched.questions()[0].as_str(), "two-sum");
}

#[tokio::test]
async fn sqlite_update_rewrites_results_and_status() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_update?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let mut session = build_session("arrays");
    repo.insert_session(&session).await.unwrap();

    session
        .apply_update(SessionUpdate {
            total_time_secs: Some(540),
            ..SessionUpdate::default()
        })
        .unwrap();
    session
        .complete(
            vec![attempt("two-sum", true), attempt("three-sum", false)],
            fixed_now() + Duration::minutes(9),
        )
        .unwrap();
    repo.update_session(&session).await.unwrap();

    let fetched = repo.get_session(session.id()).await.unwrap();
    assert_eq!(fetched.status(), SessionStatus::Completed);
    assert_eq!(fetched.total_time_secs(), 540);
    assert_eq!(fetched.results().len(), 2);
    assert_eq!(fetched.results()[0].solution(), Some("fn solve() {}"));
    assert_eq!(fetched.score(), 50);
    assert_eq!(fetched.accuracy(), 0.5);
}

#[tokio::test]
async fn sqlite_missing_session_is_not_found() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_missing?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let phantom = build_session("arrays");
    let err = repo.get_session(phantom.id()).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let err = repo.update_session(&phantom).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_duplicate_session_insert_conflicts() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_conflict?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let session = build_session("arrays");
    repo.insert_session(&session).await.unwrap();
    let err = repo.insert_session(&session).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_list_sessions_returns_only_the_users_oldest_first() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_list?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let earlier = build_session("arrays");
    repo.insert_session(&earlier).await.unwrap();

    let later_spec = NewSession::new(user(), "graphs", Difficulty::Hard);
    let later = Session::new(later_spec, fixed_now() + Duration::hours(1)).unwrap();
    repo.insert_session(&later).await.unwrap();

    let other_spec = NewSession::new(UserId::new("user-2").unwrap(), "arrays", Difficulty::Easy);
    let other = Session::new(other_spec, fixed_now()).unwrap();
    repo.insert_session(&other).await.unwrap();

    let listed = repo.list_sessions(&user()).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id(), earlier.id());
    assert_eq!(listed[1].id(), later.id());
}

#[tokio::test]
async fn sqlite_progress_upserts_per_key() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let mut record = Progress::new(user(), "arrays", Difficulty::Easy, fixed_now());
    record.record_results(
        &[attempt("two-sum", true), attempt("three-sum", true)],
        fixed_now(),
    );
    repo.upsert_progress(&record).await.unwrap();

    // second write for the same key replaces, not duplicates
    record.record_results(&[attempt("four-sum", false)], fixed_now() + Duration::days(1));
    repo.upsert_progress(&record).await.unwrap();

    let fetched = repo
        .get_progress(&user(), "arrays", Difficulty::Easy)
        .await
        .unwrap()
        .expect("record exists");
    assert_eq!(fetched.total_attempted(), 3);
    assert_eq!(fetched.total_correct(), 2);
    assert_eq!(fetched.mastery(), MasteryLevel::Advanced);
    assert_eq!(fetched.last_practiced(), Some(fixed_now() + Duration::days(1)));

    let listed = repo.list_progress(&user()).await.unwrap();
    assert_eq!(listed.len(), 1);

    let missing = repo
        .get_progress(&user(), "graphs", Difficulty::Medium)
        .await
        .unwrap();
    assert!(missing.is_none());
}
