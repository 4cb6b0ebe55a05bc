use momentum_domain::experiment::{Experiment, ExperimentAssignment, ExperimentRepository};
use momentum_domain::reward::{
    MultiplierRange, RewardCatalogRepository, RewardDefinition, RewardKind, SurpriseRoll,
    SurpriseRollRepository,
};
use momentum_infrastructure::ScriptedRandom;

mod test_helpers;

fn two_arm_experiment(name: &str, active: bool) -> Experiment {
    Experiment::new(
        name,
        "streaks",
        vec!["control".to_string(), "variant_a".to_string()],
        active,
        test_helpers::noon(test_helpers::day(2025, 1, 1)),
    )
    .expect("valid experiment")
}

// ============================================================================
// Experiments
// ============================================================================

#[tokio::test]
async fn experiment_repo_lists_only_active_experiments() {
    let (_db, uow) = test_helpers::sqlite_store().await;

    let mut tx = uow.begin().await.unwrap();
    tx.save_experiment(&two_arm_experiment("rewards_v2", true))
        .await
        .unwrap();
    tx.save_experiment(&two_arm_experiment("rewards_v1", false))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = uow.begin().await.unwrap();
    let active = tx.list_active_experiments("streaks").await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name(), "rewards_v2");
    assert_eq!(active[0].variants(), ["control", "variant_a"]);
    assert!(tx.list_active_experiments("themes").await.unwrap().is_empty());

    // Upsert flips the flag in place
    let mut v1 = tx.find_experiment("rewards_v1").await.unwrap().unwrap();
    v1.set_active(true);
    tx.save_experiment(&v1).await.unwrap();
    assert_eq!(tx.list_active_experiments("streaks").await.unwrap().len(), 2);
}

#[tokio::test]
async fn experiment_repo_keeps_first_assignment_per_feature() {
    let (_db, uow) = test_helpers::sqlite_store().await;
    let alice = test_helpers::user("alice");
    let now = test_helpers::noon(test_helpers::day(2025, 2, 1));
    let experiments = vec![two_arm_experiment("rewards_v2", true)];

    let first = ExperimentAssignment::choose(
        &alice,
        "streaks",
        &experiments,
        &ScriptedRandom::new(vec![0.0, 0.9]),
        now,
    )
    .unwrap();
    let second = ExperimentAssignment::choose(
        &alice,
        "streaks",
        &experiments,
        &ScriptedRandom::new(vec![0.0, 0.1]),
        now,
    )
    .unwrap();
    assert_eq!(first.variant(), "variant_a");
    assert_eq!(second.variant(), "control");

    let mut tx = uow.begin().await.unwrap();
    tx.save_experiment(&experiments[0]).await.unwrap();
    assert!(tx.insert_assignment_if_absent(&first).await.unwrap());
    assert!(!tx.insert_assignment_if_absent(&second).await.unwrap());
    tx.commit().await.unwrap();

    let mut tx = uow.begin().await.unwrap();
    let stored = tx.find_assignment(&alice, "streaks").await.unwrap().unwrap();
    assert_eq!(stored.variant(), "variant_a");
    assert_eq!(stored.experiment_name(), "rewards_v2");
    assert!(tx.find_assignment(&alice, "themes").await.unwrap().is_none());
}

// ============================================================================
// Reward catalog and surprise rolls
// ============================================================================

#[tokio::test]
async fn reward_repo_round_trips_catalog_entries() {
    let (_db, uow) = test_helpers::sqlite_store().await;

    let mut tx = uow.begin().await.unwrap();
    assert_eq!(tx.count_rewards().await.unwrap(), 0);
    tx.save_reward(
        &RewardDefinition::regular("control", 3, RewardKind::Points { amount: 50 }, "50 points")
            .unwrap(),
    )
    .await
    .unwrap();
    tx.save_reward(
        &RewardDefinition::regular(
            "control",
            7,
            RewardKind::FreezeGrant { count: 1 },
            "One streak freeze",
        )
        .unwrap(),
    )
    .await
    .unwrap();
    tx.save_reward(
        &RewardDefinition::surprise(
            "control",
            7,
            "Mystery box",
            0.3,
            Some(MultiplierRange::new(1.5, 3.0).unwrap()),
        )
        .unwrap(),
    )
    .await
    .unwrap();
    tx.save_reward(
        &RewardDefinition::regular(
            "variant_a",
            5,
            RewardKind::ThemeUnlock {
                theme_id: "midnight".to_string(),
            },
            "Midnight theme",
        )
        .unwrap(),
    )
    .await
    .unwrap();
    // Upsert replaces the description
    tx.save_reward(
        &RewardDefinition::regular("control", 3, RewardKind::Points { amount: 75 }, "75 points")
            .unwrap(),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut tx = uow.begin().await.unwrap();
    assert_eq!(tx.count_rewards().await.unwrap(), 4);

    let control = tx.load_catalog("control").await.unwrap();
    assert_eq!(control.entries().len(), 3);
    assert_eq!(
        control.regular_at(3).unwrap().kind(),
        &RewardKind::Points { amount: 75 }
    );
    let surprise = control.surprise_at(7).unwrap();
    assert!((surprise.probability() - 0.3).abs() < f64::EPSILON);
    let range = surprise.multiplier_range().unwrap();
    assert_eq!((range.min(), range.max()), (1.5, 3.0));

    assert_eq!(tx.load_catalog("variant_a").await.unwrap().entries().len(), 1);
    assert!(tx.load_catalog("unknown").await.unwrap().is_empty());
}

#[tokio::test]
async fn surprise_roll_is_written_once_per_day() {
    let (_db, uow) = test_helpers::sqlite_store().await;
    let alice = test_helpers::user("alice");
    let d1 = test_helpers::day(2025, 3, 7);
    let definition = RewardDefinition::surprise("control", 7, "Mystery box", 0.5, None).unwrap();

    let fired = SurpriseRoll::roll(
        &alice,
        d1,
        &definition,
        &ScriptedRandom::new(vec![0.2]),
        test_helpers::noon(d1),
    );
    let missed = SurpriseRoll::roll(
        &alice,
        d1,
        &definition,
        &ScriptedRandom::new(vec![0.9]),
        test_helpers::noon(d1),
    );

    let mut tx = uow.begin().await.unwrap();
    assert!(tx.insert_roll(&fired).await.unwrap());
    assert!(!tx.insert_roll(&missed).await.unwrap());
    tx.commit().await.unwrap();

    let mut tx = uow.begin().await.unwrap();
    let stored = tx.find_latest_roll(&alice, 7).await.unwrap().unwrap();
    assert!(stored.fired());
    assert!(stored.multiplier().is_none());
    assert_eq!(stored.roll_date(), d1);
    assert!(tx.find_latest_roll(&alice, 14).await.unwrap().is_none());
}
