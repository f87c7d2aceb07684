mod common;

use access_provisioner::domain::outcome::{CallOutcome, Outcome};
use access_provisioner::domain::ports::RetryLedger;
use access_provisioner::domain::status::GroupStatus;
use common::{World, message, request};
use rand::Rng;

const MAX_RETRIES: u32 = 6;

#[tokio::test]
async fn test_non_terminal_passes_add_exactly_one() {
    let mut rng = rand::thread_rng();

    for round in 0..50 {
        let world = World::new();
        let correlation_id = format!("req-{round}");
        let before = rng.gen_range(0..MAX_RETRIES - 1);
        world.ledger.set(&correlation_id, before).await.unwrap();

        // Alternate between the non-terminal paths.
        match round % 3 {
            0 => {
                world
                    .identity
                    .push_create(CallOutcome::BusinessFailure("busy".to_string()))
                    .await
            }
            1 => {
                world
                    .identity
                    .push_status(CallOutcome::TransientFailure("reset".to_string()))
                    .await
            }
            _ => {
                world
                    .identity
                    .insert_group("grp-apps", GroupStatus::created("g"))
                    .await;
                world
                    .vault
                    .push_create(CallOutcome::BusinessFailure("denied".to_string()))
                    .await
            }
        }

        let outcome = world
            .engine(MAX_RETRIES)
            .process(&request(&correlation_id), "receipt")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::RetryScheduled {
                retry_count: before + 1
            }
        );
        assert_eq!(world.ledger.get(&correlation_id).await.unwrap(), before + 1);
    }
}

#[tokio::test]
async fn test_exhausted_counts_never_reach_downstream() {
    let mut rng = rand::thread_rng();

    for round in 0..20 {
        let world = World::new();
        let correlation_id = format!("req-{round}");
        let count = rng.gen_range(MAX_RETRIES..MAX_RETRIES * 4);
        world.ledger.set(&correlation_id, count).await.unwrap();

        let outcome = world
            .engine(MAX_RETRIES)
            .process(&request(&correlation_id), "receipt")
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Escalated(_)));
        assert_eq!(world.identity.status_calls(), 0);
        assert_eq!(world.vault.create_calls(), 0);
    }
}

#[tokio::test]
async fn test_completed_request_is_not_redelivered() {
    let world = World::new();
    world
        .identity
        .insert_group("grp-apps", GroupStatus::created("g"))
        .await;
    world.queue.enqueue(message(1, "done")).await;
    let dispatcher = world.dispatcher(MAX_RETRIES);

    assert_eq!(world.redeliver(&dispatcher).await, 1);
    assert_eq!(world.redeliver(&dispatcher).await, 0);

    assert_eq!(world.notifier.notifications().await.len(), 1);
    assert_eq!(world.vault.create_calls(), 1);
}

#[tokio::test]
async fn test_duplicate_copy_only_reaches_idempotent_downstream() {
    let world = World::new();
    world
        .identity
        .insert_group("grp-apps", GroupStatus::created("g"))
        .await;
    let engine = world.engine(MAX_RETRIES);

    // A second copy was already in flight when the first one finished.
    let first = engine.process(&request("dup"), "receipt-a").await.unwrap();
    let second = engine.process(&request("dup"), "receipt-b").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(world.vault.safe_count().await, 1);
    assert!(world.ledger.record("dup").await.is_none());
}

#[tokio::test]
async fn test_racing_copies_lose_an_increment_but_still_escalate() {
    let world = World::new();
    world
        .identity
        .insert_group("grp-apps", GroupStatus::created("g"))
        .await;
    let engine = world.engine(MAX_RETRIES);

    // Both copies read the same count before either writes.
    for _ in 0..2 {
        world
            .vault
            .push_create(CallOutcome::BusinessFailure("denied".to_string()))
            .await;
    }
    world.ledger.set("race", 2).await.unwrap();
    let race_a = request("race");
    let race_b = request("race");
    let (a, b) = tokio::join!(
        engine.process(&race_a, "receipt-a"),
        engine.process(&race_b, "receipt-b"),
    );
    assert!(matches!(a.unwrap(), Outcome::RetryScheduled { .. }));
    assert!(matches!(b.unwrap(), Outcome::RetryScheduled { .. }));
    let after_race = world.ledger.get("race").await.unwrap();
    assert!((3..=4).contains(&after_race));

    // Keep failing until the budget is spent; escalation still happens.
    for _ in 0..MAX_RETRIES {
        world
            .vault
            .push_create(CallOutcome::BusinessFailure("denied".to_string()))
            .await;
    }
    let mut escalated = false;
    for _ in 0..MAX_RETRIES {
        if let Outcome::Escalated(_) = engine.process(&request("race"), "receipt-a").await.unwrap() {
            escalated = true;
            break;
        }
    }
    assert!(escalated);
    assert_eq!(world.dead_letters.payloads().await.len(), 1);
}
