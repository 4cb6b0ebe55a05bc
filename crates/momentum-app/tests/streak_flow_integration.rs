// Integration tests for the streak tracker
// Run with: cargo test --test streak_flow_integration

mod test_helpers;

use momentum_domain::activity::ActivityMetrics;
use momentum_domain::freeze::{FreezePolicy, FreezeSource, FreezeStatus};
use momentum_domain::shared::{DomainError, TransactionContext};
use momentum_domain::store::UnitOfWork;
use momentum_domain::streak::{StreakRepository, StreakTransition};
use test_helpers::{day, metrics, sqlite_store, user, Engine};

#[tokio::test]
async fn test_freeze_bridges_one_missed_day_then_gap_resets() {
    let engine = Engine::start(day(2025, 3, 1), vec![]).await;
    let alice = user("alice");

    let first = engine.log(&alice).await;
    assert_eq!(first.transition, StreakTransition::Started);
    assert_eq!(first.streak.current_streak(), 1);
    assert!(first.new_badges.contains(&"first_steps".to_string()));

    engine
        .freeze
        .grant_freeze(&alice, FreezeSource::Admin)
        .await
        .expect("Failed to grant freeze");

    engine.next_day();
    let second = engine.log(&alice).await;
    assert_eq!(second.transition, StreakTransition::Extended);
    assert_eq!(second.streak.current_streak(), 2);
    assert_eq!(second.streak.freeze_count(), 1);

    // Day 3 is skipped
    engine.clock.advance_days(2);
    let bridged = engine.log(&alice).await;
    assert_eq!(
        bridged.transition,
        StreakTransition::Bridged {
            consumed_freeze: true
        }
    );
    assert!(bridged.freeze_bridged());
    assert_eq!(bridged.streak.current_streak(), 2);
    assert_eq!(bridged.streak.freeze_count(), 0);
    let used = bridged.freeze_used.expect("a freeze should be consumed");
    assert_eq!(used.status(), FreezeStatus::Used);
    assert_eq!(used.protected_date(), Some(day(2025, 3, 3)));

    // Day 5 is skipped with no freeze left
    engine.clock.advance_days(2);
    let reset = engine.log(&alice).await;
    assert_eq!(
        reset.transition,
        StreakTransition::Reset {
            previous_streak: 2,
            gap_days: 2
        }
    );
    assert!(reset.streak_reset());
    assert_eq!(reset.streak.current_streak(), 1);
    assert_eq!(reset.streak.longest_streak(), 2);
}

#[tokio::test]
async fn test_same_day_sessions_aggregate_into_one_record() {
    let engine = Engine::start(day(2025, 3, 1), vec![]).await;
    let bob = user("bob");

    engine.log(&bob).await;
    let again = engine
        .streak
        .log_activity(
            &bob,
            &ActivityMetrics {
                practice_seconds: 300,
                characters_typed: 500,
                words_typed: 100,
                wpm: 60.0,
                accuracy: 97.5,
            },
        )
        .await
        .expect("Failed to log second session");

    assert_eq!(again.transition, StreakTransition::SameDay);
    assert_eq!(again.streak.current_streak(), 1);
    assert_eq!(again.activity.session_count(), 2);
    assert_eq!(again.activity.practice_seconds(), 900);
    assert_eq!(again.activity.words_typed(), 400);
    assert!(again.new_badges.is_empty(), "first_steps is only awarded once");
}

#[tokio::test]
async fn test_get_streak_creates_record_lazily() {
    let engine = Engine::start(day(2025, 3, 1), vec![]).await;
    let carol = user("carol");

    let state = engine
        .streak
        .get_streak(&carol)
        .await
        .expect("Failed to get streak");
    assert_eq!(state.current_streak(), 0);
    assert_eq!(state.longest_streak(), 0);
    assert_eq!(state.last_activity_date(), None);

    let mut tx = engine.uow.begin().await.unwrap();
    let stored = tx.find_streak(&carol).await.unwrap();
    tx.commit().await.unwrap();
    assert!(stored.is_some(), "first access persists the streak record");
}

#[tokio::test]
async fn test_clock_moving_backwards_keeps_stored_day() {
    let engine = Engine::start(day(2025, 3, 10), vec![]).await;
    let dave = user("dave");

    engine.log(&dave).await;
    engine.clock.set(
        day(2025, 3, 8)
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc(),
    );

    let outcome = engine.log(&dave).await;
    assert_eq!(outcome.transition, StreakTransition::SameDay);
    assert_eq!(outcome.streak.last_activity_date(), Some(day(2025, 3, 10)));
    assert_eq!(outcome.activity.date(), day(2025, 3, 10));
    assert_eq!(outcome.activity.session_count(), 2);
}

#[tokio::test]
async fn test_invalid_metrics_are_rejected_before_any_write() {
    let engine = Engine::start(day(2025, 3, 1), vec![]).await;
    let erin = user("erin");

    let err = engine
        .streak
        .log_activity(
            &erin,
            &ActivityMetrics {
                accuracy: 120.0,
                ..metrics()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = engine
        .streak
        .log_activity(
            &erin,
            &ActivityMetrics {
                wpm: -1.0,
                ..metrics()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let state = engine.streak.get_streak(&erin).await.unwrap();
    assert_eq!(state.current_streak(), 0);
}

#[tokio::test]
async fn test_activity_history_range() {
    let engine = Engine::start(day(2025, 3, 1), vec![]).await;
    let frank = user("frank");

    engine.practice_days(&frank, 3).await;

    let history = engine
        .streak
        .get_activity_history(&frank, day(2025, 2, 1), day(2025, 3, 31))
        .await
        .expect("Failed to load history");
    let dates: Vec<_> = history.iter().map(|r| r.date()).collect();
    assert_eq!(
        dates,
        vec![day(2025, 3, 1), day(2025, 3, 2), day(2025, 3, 3)]
    );

    let single = engine
        .streak
        .get_activity_history(&frank, day(2025, 3, 2), day(2025, 3, 2))
        .await
        .unwrap();
    assert_eq!(single.len(), 1);

    let err = engine
        .streak
        .get_activity_history(&frank, day(2025, 3, 3), day(2025, 3, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput(_)));

    let err = engine
        .streak
        .get_activity_history(&frank, day(2024, 3, 1), day(2025, 3, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput(_)));
}

#[tokio::test]
async fn test_week_streak_earns_week_warrior_once() {
    let engine = Engine::start(day(2025, 3, 1), vec![]).await;
    let gina = user("gina");

    let seventh = engine.practice_days(&gina, 7).await;
    assert_eq!(seventh.streak.current_streak(), 7);
    assert_eq!(seventh.new_badges, vec!["week_warrior".to_string()]);

    engine.next_day();
    let eighth = engine.log(&gina).await;
    assert!(eighth.new_badges.is_empty());
}

#[tokio::test]
async fn test_streak_flow_on_sqlite_store() {
    let (db, uow) = sqlite_store().await;
    let engine = Engine::on_store(uow, day(2025, 3, 1), vec![], FreezePolicy::default()).await;
    let henry = user("henry");

    engine.practice_days(&henry, 2).await;
    engine
        .freeze
        .grant_freeze(&henry, FreezeSource::Purchase)
        .await
        .unwrap();

    engine.clock.advance_days(2);
    let bridged = engine.log(&henry).await;
    assert_eq!(
        bridged.transition,
        StreakTransition::Bridged {
            consumed_freeze: true
        }
    );
    assert_eq!(bridged.streak.current_streak(), 2);

    let freezes = engine.freeze.list_freezes(&henry).await.unwrap();
    assert_eq!(freezes.len(), 1);
    assert_eq!(freezes[0].status(), FreezeStatus::Used);

    db.close().await;
}
