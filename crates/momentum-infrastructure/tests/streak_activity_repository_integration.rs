use chrono::Duration;

use momentum_domain::activity::{ActivityLogRepository, ActivityMetrics, DailyActivityRecord};
use momentum_domain::shared::DomainError;
use momentum_domain::streak::{StreakRepository, StreakState};

mod test_helpers;

fn metrics(seconds: u32, words: u32, wpm: f64, accuracy: f64) -> ActivityMetrics {
    ActivityMetrics {
        practice_seconds: seconds,
        characters_typed: words * 5,
        words_typed: words,
        wpm,
        accuracy,
    }
}

#[tokio::test]
async fn streak_repo_save_find_and_update_integration() {
    let (_db, uow) = test_helpers::sqlite_store().await;
    let alice = test_helpers::user("alice");
    let d1 = test_helpers::day(2025, 6, 1);

    let mut state = StreakState::new(alice.clone(), test_helpers::noon(d1));
    state.apply_activity(d1, test_helpers::noon(d1));

    let mut tx = uow.begin().await.expect("begin");
    assert!(tx.find_streak(&alice).await.expect("find").is_none());
    tx.save_streak(&state).await.expect("save");
    tx.commit().await.expect("commit");

    let d2 = d1 + Duration::days(1);
    let mut tx = uow.begin().await.expect("begin");
    let mut stored = tx
        .find_streak(&alice)
        .await
        .expect("find")
        .expect("should exist");
    assert_eq!(stored.current_streak(), 1);
    assert_eq!(stored.last_activity_date(), Some(d1));

    stored.apply_activity(d2, test_helpers::noon(d2));
    tx.save_streak(&stored).await.expect("update");
    tx.commit().await.expect("commit");

    let mut tx = uow.begin().await.expect("begin");
    let stored = tx.find_streak(&alice).await.unwrap().unwrap();
    assert_eq!(stored.current_streak(), 2);
    assert_eq!(stored.longest_streak(), 2);
    assert!(!stored.freeze_pending_consumption());
}

#[tokio::test]
async fn streak_repo_rejects_rows_breaking_invariant() {
    let db = test_helpers::setup_in_memory_db().await;

    // The CHECK constraint refuses the write outright
    let result = sqlx::query(
        "INSERT INTO streak_states (user_id, current_streak, longest_streak, updated_at) VALUES ('x', 5, 2, '2025-01-01T00:00:00+00:00')",
    )
    .execute(db.pool())
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn activity_repo_upserts_one_row_per_day_integration() {
    let (_db, uow) = test_helpers::sqlite_store().await;
    let bob = test_helpers::user("bob");
    let d1 = test_helpers::day(2025, 6, 1);
    let d2 = d1 + Duration::days(1);
    let now = test_helpers::noon(d1);

    let mut tx = uow.begin().await.unwrap();
    let mut record = DailyActivityRecord::first_session(bob.clone(), d1, &metrics(600, 300, 40.0, 90.0), now);
    tx.save_activity(&record).await.unwrap();
    record.record_session(&metrics(300, 100, 60.0, 100.0), now);
    tx.save_activity(&record).await.unwrap();
    tx.save_activity(&DailyActivityRecord::first_session(
        bob.clone(),
        d2,
        &metrics(120, 50, 70.0, 80.0),
        test_helpers::noon(d2),
    ))
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut tx = uow.begin().await.unwrap();
    let day_one = tx.find_activity(&bob, d1).await.unwrap().unwrap();
    assert_eq!(day_one.practice_seconds(), 900);
    assert_eq!(day_one.words_typed(), 400);
    assert_eq!(day_one.session_count(), 2);
    assert!((day_one.average_wpm() - 50.0).abs() < 1e-9);

    let history = tx.list_activity(&bob, d1, d2).await.unwrap();
    assert_eq!(
        history.iter().map(|r| r.date()).collect::<Vec<_>>(),
        vec![d1, d2]
    );

    let totals = tx.activity_totals(&bob).await.unwrap();
    assert_eq!(totals.active_days, 2);
    assert_eq!(totals.practice_seconds, 1020);
    assert_eq!(totals.words_typed, 450);
    assert!((totals.best_daily_wpm - 70.0).abs() < 1e-9);

    let empty = tx
        .activity_totals(&test_helpers::user("nobody"))
        .await
        .unwrap();
    assert_eq!(empty.active_days, 0);
    assert_eq!(empty.practice_seconds, 0);
}

#[tokio::test]
async fn rolled_back_writes_are_invisible() {
    let (_db, uow) = test_helpers::sqlite_store().await;
    let carol = test_helpers::user("carol");
    let d1 = test_helpers::day(2025, 6, 1);

    let mut tx = uow.begin().await.unwrap();
    tx.save_streak(&StreakState::new(carol.clone(), test_helpers::noon(d1)))
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    let mut tx = uow.begin().await.unwrap();
    let result: Result<_, DomainError> = tx.find_streak(&carol).await;
    assert!(result.unwrap().is_none());
}
