use chrono::Duration;

use momentum_domain::claim::{AppliedEffect, ClaimRecord, ClaimRepository};
use momentum_domain::shared::DomainError;

mod test_helpers;

fn points_claim(user: &str, milestone: u32, minutes: i64) -> ClaimRecord {
    ClaimRecord::new(
        test_helpers::user(user),
        milestone,
        "control",
        "points",
        AppliedEffect::Points {
            amount: i64::from(milestone) * 5,
            multiplier: None,
        },
        test_helpers::noon(test_helpers::day(2025, 6, 1)) + Duration::minutes(minutes),
    )
}

#[tokio::test]
async fn claim_repo_rejects_second_claim_for_milestone() {
    let (_db, uow) = test_helpers::sqlite_store().await;

    let mut tx = uow.begin().await.unwrap();
    tx.insert_claim(&points_claim("alice", 10, 0)).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = uow.begin().await.unwrap();
    let err = tx
        .insert_claim(&points_claim("alice", 10, 5))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::AlreadyClaimed { milestone: 10 });

    // Another user can still claim the same milestone
    tx.insert_claim(&points_claim("bob", 10, 5)).await.unwrap();
}

#[tokio::test]
async fn claim_repo_lists_newest_first_with_paging() {
    let (_db, uow) = test_helpers::sqlite_store().await;
    let alice = test_helpers::user("alice");

    let mut tx = uow.begin().await.unwrap();
    for (i, milestone) in [3u32, 7, 10, 14].into_iter().enumerate() {
        tx.insert_claim(&points_claim("alice", milestone, i as i64))
            .await
            .unwrap();
    }
    tx.commit().await.unwrap();

    let mut tx = uow.begin().await.unwrap();
    let first_page = tx.list_claims(&alice, 0, 3).await.unwrap();
    assert_eq!(
        first_page.iter().map(|c| c.milestone()).collect::<Vec<_>>(),
        vec![14, 10, 7]
    );
    let second_page = tx.list_claims(&alice, 3, 3).await.unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].milestone(), 3);

    assert_eq!(tx.count_claims(&alice).await.unwrap(), 4);
    assert_eq!(
        tx.claimed_milestones(&alice).await.unwrap(),
        vec![3, 7, 10, 14]
    );

    let stored = tx.find_claim(&alice, 10).await.unwrap().unwrap();
    assert_eq!(
        stored.applied_effect(),
        &AppliedEffect::Points {
            amount: 50,
            multiplier: None
        }
    );
    assert_eq!(stored.variant(), "control");
    assert!(tx.find_claim(&alice, 11).await.unwrap().is_none());
}
