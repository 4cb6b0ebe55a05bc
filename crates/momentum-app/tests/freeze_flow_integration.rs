// Integration tests for freeze grants, explicit use and expiry
// Run with: cargo test --test freeze_flow_integration

mod test_helpers;

use momentum_domain::freeze::{FreezePolicy, FreezeRepository, FreezeSource, FreezeStatus};
use momentum_domain::shared::{DomainError, TransactionContext};
use momentum_domain::store::UnitOfWork;
use momentum_domain::streak::StreakTransition;
use test_helpers::{day, user, Engine};

#[tokio::test]
async fn test_grant_is_rejected_at_the_cap() {
    let engine = Engine::start(day(2025, 4, 1), vec![]).await;
    let alice = user("alice");

    for _ in 0..3 {
        engine
            .freeze
            .grant_freeze(&alice, FreezeSource::Purchase)
            .await
            .expect("Failed to grant freeze");
    }

    let err = engine
        .freeze
        .grant_freeze(&alice, FreezeSource::Purchase)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::FreezeLimitReached { limit: 3 }));

    let state = engine.streak.get_streak(&alice).await.unwrap();
    assert_eq!(state.freeze_count(), 3);
}

#[tokio::test]
async fn test_freeze_used_ahead_protects_the_missed_day() {
    let engine = Engine::start(day(2025, 4, 1), vec![]).await;
    let bob = user("bob");

    engine.practice_days(&bob, 2).await;
    let freeze = engine
        .freeze
        .grant_freeze(&bob, FreezeSource::Reward)
        .await
        .unwrap();

    // April 3rd is missed; the freeze is applied on the 4th before practice
    engine.clock.advance_days(2);
    let usage = engine
        .freeze
        .use_freeze(&bob, freeze.id())
        .await
        .expect("Failed to use freeze");
    assert_eq!(usage.protected_streak, 2);
    assert_eq!(usage.freeze.status(), FreezeStatus::Used);
    assert_eq!(usage.freeze.protected_date(), Some(day(2025, 4, 3)));
    assert!(usage.streak.freeze_pending_consumption());
    assert_eq!(usage.streak.freeze_count(), 0);

    let outcome = engine.log(&bob).await;
    assert_eq!(
        outcome.transition,
        StreakTransition::Bridged {
            consumed_freeze: false
        }
    );
    assert!(outcome.freeze_used.is_none());
    assert_eq!(outcome.streak.current_streak(), 2);
    assert!(!outcome.streak.freeze_pending_consumption());

    engine.next_day();
    assert_eq!(engine.log(&bob).await.streak.current_streak(), 3);
}

#[tokio::test]
async fn test_use_freeze_rejects_bad_ids() {
    let engine = Engine::start(day(2025, 4, 1), vec![]).await;
    let carol = user("carol");

    let err = engine.freeze.use_freeze(&carol, 0).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidFreezeId(_)));

    let err = engine.freeze.use_freeze(&carol, -4).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidFreezeId(_)));

    let err = engine.freeze.use_freeze(&carol, 999).await.unwrap_err();
    assert!(matches!(err, DomainError::FreezeNotFoundOrExpired(999)));
}

#[tokio::test]
async fn test_freeze_of_another_user_is_not_found() {
    let engine = Engine::start(day(2025, 4, 1), vec![]).await;
    let owner = user("owner");
    let other = user("other");

    let freeze = engine
        .freeze
        .grant_freeze(&owner, FreezeSource::Admin)
        .await
        .unwrap();
    let err = engine
        .freeze
        .use_freeze(&other, freeze.id())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::FreezeNotFoundOrExpired(_)));
}

#[tokio::test]
async fn test_use_freeze_requires_exactly_one_missed_day() {
    let engine = Engine::start(day(2025, 4, 1), vec![]).await;
    let dave = user("dave");

    let freeze = engine
        .freeze
        .grant_freeze(&dave, FreezeSource::Admin)
        .await
        .unwrap();

    // No streak yet
    let err = engine.freeze.use_freeze(&dave, freeze.id()).await.unwrap_err();
    assert!(matches!(err, DomainError::FreezeNotApplicable(_)));

    // Practiced today, nothing missed
    engine.log(&dave).await;
    let err = engine.freeze.use_freeze(&dave, freeze.id()).await.unwrap_err();
    assert!(matches!(err, DomainError::FreezeNotApplicable(_)));

    // Two missed days are beyond a single freeze
    engine.clock.advance_days(3);
    let err = engine.freeze.use_freeze(&dave, freeze.id()).await.unwrap_err();
    assert!(matches!(err, DomainError::FreezeNotApplicable(_)));

    let freezes = engine.freeze.list_freezes(&dave).await.unwrap();
    assert_eq!(freezes[0].status(), FreezeStatus::Available);
}

#[tokio::test]
async fn test_expired_freeze_is_recorded_even_when_use_fails() {
    let policy = FreezePolicy {
        max_unused: 1,
        validity_days: Some(2),
    };
    let engine = Engine::with_policy(day(2025, 4, 1), vec![], policy).await;
    let erin = user("erin");

    engine.log(&erin).await;
    let freeze = engine
        .freeze
        .grant_freeze(&erin, FreezeSource::Purchase)
        .await
        .unwrap();

    engine.clock.advance_days(2);
    let err = engine.freeze.use_freeze(&erin, freeze.id()).await.unwrap_err();
    assert!(matches!(err, DomainError::FreezeNotFoundOrExpired(_)));

    let mut tx = engine.uow.begin().await.unwrap();
    let stored = tx.list_freezes(&erin).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status(), FreezeStatus::Expired);

    // The expired token no longer counts against the cap
    let replacement = engine
        .freeze
        .grant_freeze(&erin, FreezeSource::Purchase)
        .await
        .expect("Expired freezes free up the cap");
    assert_ne!(replacement.id(), freeze.id());
    assert_eq!(engine.streak.get_streak(&erin).await.unwrap().freeze_count(), 1);
}

#[tokio::test]
async fn test_list_freezes_newest_first() {
    let engine = Engine::start(day(2025, 4, 1), vec![]).await;
    let frank = user("frank");

    let first = engine
        .freeze
        .grant_freeze(&frank, FreezeSource::Reward)
        .await
        .unwrap();
    engine.next_day();
    let second = engine
        .freeze
        .grant_freeze(&frank, FreezeSource::Admin)
        .await
        .unwrap();

    let freezes = engine.freeze.list_freezes(&frank).await.unwrap();
    let ids: Vec<i64> = freezes.iter().map(|f| f.id()).collect();
    assert_eq!(ids, vec![second.id(), first.id()]);
    assert_eq!(freezes[0].source(), FreezeSource::Admin);
}
