use chrono::{TimeZone, Utc};
use katalyst_core::{CoreConfig, Grade, QuizResult, QuizResultStore, SqliteResultStore, StoreError};
use tempfile::TempDir;

fn result(day: u32, score: usize, total: usize) -> QuizResult {
    let percentage = score as f64 / total as f64 * 100.0;
    QuizResult {
        date: Utc.with_ymd_and_hms(2024, 11, day, 9, 0, 0).unwrap(),
        score,
        total_questions: total,
        earned_marks: score as f64,
        total_marks: total as f64,
        percentage,
        grade: Grade::from_percentage(percentage),
    }
}

#[test]
fn results_survive_reopen_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("katalyst.db");

    {
        let mut store = SqliteResultStore::open(&path).unwrap();
        store.append(&result(1, 1, 4)).unwrap();
        store.append(&result(2, 4, 4)).unwrap();
    }

    let store = SqliteResultStore::open(&path).unwrap();
    let all = store.read_all().unwrap();
    assert_eq!(all, vec![result(1, 1, 4), result(2, 4, 4)]);
}

#[test]
fn store_follows_configuration() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    let config = CoreConfig::from_toml_str(&format!(
        "[storage]\nresults_key = \"practiceResults\"\ndatabase_path = {:?}\n",
        path.to_string_lossy()
    ))
    .unwrap();

    let mut store = SqliteResultStore::from_settings(&config.storage).unwrap();
    assert_eq!(store.key(), "practiceResults");
    store.append(&result(3, 2, 2)).unwrap();

    let default_key = SqliteResultStore::open(&path).unwrap();
    assert!(default_key.read_all().unwrap().is_empty());
    let practice = SqliteResultStore::open(&path).unwrap().with_key("practiceResults");
    assert_eq!(practice.read_all().unwrap().len(), 1);
}

#[test]
fn log_written_by_browser_client_is_readable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    katalyst_core::db::init_database(&conn).unwrap();
    katalyst_core::db::put_value(
        &conn,
        "quizResults",
        r#"[{"date":"2024-10-30T18:12:44.512Z","score":7,"totalQuestions":10,
            "earnedMarks":7,"totalMarks":10,"percentage":"70.0","grade":"B"}]"#,
    )
    .unwrap();
    drop(conn);

    let mut store = SqliteResultStore::open(&path).unwrap();
    store.append(&result(4, 3, 3)).unwrap();
    let all = store.read_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].percentage, 70.0);
    assert_eq!(all[0].grade, Grade::B);
    assert_eq!(all[1].grade, Grade::APlus);
}

#[test]
fn unreadable_log_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    katalyst_core::db::init_database(&conn).unwrap();
    katalyst_core::db::put_value(&conn, "quizResults", "{\"not\": \"a list\"}").unwrap();
    drop(conn);

    let store = SqliteResultStore::open(&path).unwrap();
    assert!(matches!(store.read_all(), Err(StoreError::Corrupt { .. })));
}
