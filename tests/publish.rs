//! Producer side: the publish transaction and its failure modes.

mod support;

use std::sync::Barrier;
use std::thread;

use storymint::{Caller, Error, ErrorKind, OutboxStatus, WorkId, WorkStatus};
use support::{owner, stranger, Harness, METADATA, OWNER};

#[test]
fn owner_publishes_draft() {
    let h = Harness::new();
    let work = h.draft();

    let receipt = h.publisher.publish(work.id.as_str(), &owner()).unwrap();

    assert_eq!(h.work(&work.id).status, WorkStatus::Publishing);

    let event = h.event_for(&work.id);
    assert_eq!(event.id, receipt.event_id);
    assert_eq!(event.event_type, "MintRequested");
    assert_eq!(event.status, OutboxStatus::Pending);
    assert_eq!(event.attempts, 0);
    assert_eq!(event.payload["work_id"], work.id.as_str());
    assert_eq!(event.payload["owner_wallet"], OWNER.to_ascii_lowercase());
    assert_eq!(event.payload["metadata_uri"], METADATA);
    assert_eq!(event.payload["title"], "The Lighthouse");
}

#[test]
fn second_publish_conflicts_without_new_event() {
    let h = Harness::new();
    let id = h.published();

    let err = h.publisher.publish(id.as_str(), &owner()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(h.work(&id).status, WorkStatus::Publishing);
    h.event_for(&id);
}

#[test]
fn owner_wallet_matches_case_insensitively() {
    let h = Harness::new();
    let work = h.draft();

    let shouting = OWNER.to_ascii_uppercase().replacen("0X", "0x", 1);
    let caller = Caller::user("author-1").with_wallet(shouting);
    h.publisher.publish(work.id.as_str(), &caller).unwrap();

    assert_eq!(h.work(&work.id).status, WorkStatus::Publishing);
}

#[test]
fn errors_are_reported_in_order() {
    let h = Harness::new();
    let work = h.draft();

    // Unauthenticated beats a malformed id.
    let err = h.publisher.publish("not-a-uuid", &Caller::anonymous()).unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    // A blank wallet or user id is no identity either.
    for caller in [
        Caller::user("author-1"),
        Caller::user("author-1").with_wallet("   "),
        Caller::user("  ").with_wallet(OWNER),
    ] {
        let err = h.publisher.publish("not-a-uuid", &caller).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)), "{:?}", caller);
        let err = h.publisher.publish(work.id.as_str(), &caller).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)), "{:?}", caller);
    }

    let err = h.publisher.publish("not-a-uuid", &owner()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = h.publisher.publish("", &owner()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let missing = WorkId::generate();
    let err = h.publisher.publish(missing.as_str(), &owner()).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = h.publisher.publish(work.id.as_str(), &stranger()).unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    assert_eq!(h.work(&work.id).status, WorkStatus::Draft);
    assert!(h.outbox().for_aggregate(work.id.as_str()).unwrap().is_empty());
}

#[test]
fn non_draft_statuses_conflict() {
    let h = Harness::new();

    for status in [WorkStatus::Publishing, WorkStatus::Minted, WorkStatus::Failed] {
        let mut work = h.draft();
        work.status = status;
        h.store_work(&work);

        let err = h.publisher.publish(work.id.as_str(), &owner()).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "status {:?}", status);
        assert_eq!(h.work(&work.id).status, status);
        assert!(h.outbox().for_aggregate(work.id.as_str()).unwrap().is_empty());
    }
}

#[test]
fn blank_metadata_rolls_back() {
    let h = Harness::new();
    let mut work = h.draft();
    work.metadata_uri = Some("   ".into());
    h.store_work(&work);

    let err = h.publisher.publish(work.id.as_str(), &owner()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(h.work(&work.id).status, WorkStatus::Draft);
    assert!(h.outbox().for_aggregate(work.id.as_str()).unwrap().is_empty());

    // Fixing the work makes it publishable again.
    work.metadata_uri = Some(METADATA.into());
    h.store_work(&work);
    h.publisher.publish(work.id.as_str(), &owner()).unwrap();
    h.event_for(&work.id);
}

#[test]
fn racing_publishers_enqueue_once() {
    const PUBLISHERS: usize = 8;
    let h = Harness::new();

    for _ in 0..10 {
        let work = h.draft();
        let barrier = Barrier::new(PUBLISHERS);

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..PUBLISHERS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        h.publisher.publish(work.id.as_str(), &owner())
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        let published = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(published, 1);
        for result in &results {
            if let Err(err) = result {
                assert!(matches!(err, Error::Conflict(_)), "{:?}", err);
            }
        }

        assert_eq!(h.work(&work.id).status, WorkStatus::Publishing);
        let event = h.event_for(&work.id);
        assert_eq!(event.status, OutboxStatus::Pending);
    }
}
