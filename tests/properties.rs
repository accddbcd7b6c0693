//! Properties of the publish/claim/retry pipeline over generated inputs.

mod support;

use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use proptest::prelude::*;
use storymint::{
    AdapterError, EventPayload, InMemoryModelStore, MintRequested, MintWorkerThread,
    OutboxStatus, OutboxStore, TickOutcome, WalletAddress, WorkId, WorkStatus,
};
use support::{owner, stranger, Harness, OWNER};

fn arb_non_draft() -> impl Strategy<Value = WorkStatus> {
    prop_oneof![
        Just(WorkStatus::Publishing),
        Just(WorkStatus::Minted),
        Just(WorkStatus::Failed),
    ]
}

fn mint_requested() -> EventPayload {
    EventPayload::MintRequested(MintRequested {
        work_id: WorkId::generate(),
        owner_wallet: WalletAddress::new(OWNER),
        metadata_uri: "ipfs://meta".into(),
        title: "Title".into(),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Publishing a non-draft work never creates an event or moves its status.
    #[test]
    fn prop_non_draft_publish_is_rejected(
        status in arb_non_draft(),
        by_owner in any::<bool>(),
        attempts in 1usize..4,
    ) {
        let h = Harness::new();
        let mut work = h.draft();
        work.status = status;
        h.store_work(&work);

        let caller = if by_owner { owner() } else { stranger() };
        for _ in 0..attempts {
            prop_assert!(h.publisher.publish(work.id.as_str(), &caller).is_err());
        }

        prop_assert_eq!(h.work(&work.id).status, status);
        prop_assert!(h.outbox().for_aggregate(work.id.as_str()).unwrap().is_empty());
    }

    /// Transient ticks never touch the attempt counter; every other failure
    /// adds exactly one, and the event is parked exactly when it reaches the
    /// threshold.
    #[test]
    fn prop_retry_accounting(
        max_attempts in 1u32..5,
        faults in prop::collection::vec(any::<bool>(), 0..20),
    ) {
        let h = Harness::new();
        let id = h.published();
        let mut worker = h.worker_with(h.config().with_max_attempts(max_attempts));

        // Submit; the receipt is not there yet.
        prop_assert_eq!(worker.tick(), TickOutcome::Requeued { transient: true });

        let mut expected = 0u32;
        for fault in faults {
            if expected >= max_attempts {
                prop_assert_eq!(worker.tick(), TickOutcome::Idle);
                continue;
            }

            if fault {
                h.ledger.fail_next_status(AdapterError::Network("timeout".into()));
                expected += 1;
            }
            let outcome = worker.tick();

            let event = h.event_for(&id);
            prop_assert_eq!(event.attempts, expected);
            if expected >= max_attempts {
                prop_assert_eq!(outcome, TickOutcome::Failed);
                prop_assert_eq!(event.status, OutboxStatus::Failed);
            } else {
                prop_assert_eq!(outcome, TickOutcome::Requeued { transient: !fault });
                prop_assert_eq!(event.status, OutboxStatus::Pending);
            }
        }

        prop_assert_eq!(h.ledger.submit_count(), 1);
    }

    /// Racing claimers never share an event, and together drain the queue.
    #[test]
    fn prop_concurrent_claims_are_exclusive(
        events in 1usize..12,
        claimers in 2usize..5,
    ) {
        let store = InMemoryModelStore::new();
        let outbox = OutboxStore::new(store);
        for _ in 0..events {
            outbox.enqueue(&mint_requested(), SystemTime::UNIX_EPOCH).unwrap();
        }

        let handles: Vec<_> = (0..claimers)
            .map(|_| {
                let outbox = outbox.clone();
                thread::spawn(move || {
                    let mut claimed = Vec::new();
                    while let Some(event) = outbox.claim(SystemTime::UNIX_EPOCH).unwrap() {
                        claimed.push(event.id);
                    }
                    claimed
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                prop_assert!(seen.insert(id), "event claimed twice");
            }
        }
        prop_assert_eq!(seen.len(), events);
        prop_assert!(outbox.by_status(OutboxStatus::Pending).unwrap().is_empty());
    }
}

#[test]
fn one_pending_event_has_one_winner() {
    let outbox = OutboxStore::new(InMemoryModelStore::new());
    outbox
        .enqueue(&mint_requested(), SystemTime::UNIX_EPOCH)
        .unwrap();

    let winners: usize = (0..8)
        .map(|_| {
            let outbox = outbox.clone();
            thread::spawn(move || outbox.claim(SystemTime::UNIX_EPOCH).unwrap().is_some())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| usize::from(handle.join().unwrap()))
        .sum();

    assert_eq!(winners, 1);
}

#[test]
fn competing_workers_mint_each_work_once() {
    let h = Harness::new();
    let ledger = h.ledger.clone().auto_mining();
    let ids: Vec<_> = (0..6).map(|_| h.published()).collect();

    let workers: Vec<_> = (0..3)
        .map(|n| {
            let config = h.config().with_worker_id(format!("worker-{}", n));
            MintWorkerThread::spawn(h.worker_with(config))
        })
        .collect();

    let deadline = Instant::now() + Duration::from_secs(5);
    while ids
        .iter()
        .any(|id| h.work(id).status != WorkStatus::Minted)
        && Instant::now() < deadline
    {
        thread::sleep(Duration::from_millis(5));
    }
    let completed: usize = workers.into_iter().map(|w| w.stop().completed).sum();

    assert_eq!(completed, ids.len());
    assert_eq!(ledger.submit_count(), ids.len());
    for id in &ids {
        assert_eq!(h.work(id).status, WorkStatus::Minted);
        assert_eq!(h.event_for(id).status, OutboxStatus::Completed);
    }
}
