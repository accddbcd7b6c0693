//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use storymint::{
    Caller, Clock, InMemoryLedger, InMemoryModelStore, ManualClock, MintWorker, ModelStore,
    OutboxEvent, OutboxStore, PublishService, WalletAddress, Work, WorkId, WorkStore, WorkerConfig,
};

pub const OWNER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const STRANGER: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
pub const METADATA: &str = "ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// One store, ledger and clock shared by a publisher and any number of workers.
pub struct Harness {
    pub store: InMemoryModelStore,
    pub ledger: InMemoryLedger,
    pub clock: ManualClock,
    pub publisher: PublishService<InMemoryModelStore, ManualClock>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let store = InMemoryModelStore::new();
        let clock = ManualClock::new();
        Self {
            publisher: PublishService::with_clock(store.clone(), clock.clone()),
            ledger: InMemoryLedger::new(),
            store,
            clock,
        }
    }

    pub fn works(&self) -> WorkStore<InMemoryModelStore> {
        WorkStore::new(self.store.clone())
    }

    pub fn outbox(&self) -> OutboxStore<InMemoryModelStore> {
        OutboxStore::new(self.store.clone())
    }

    pub fn config(&self) -> WorkerConfig {
        WorkerConfig::default()
            .with_worker_id("test-worker")
            .with_poll_interval(Duration::from_secs(2))
    }

    pub fn worker(&self) -> MintWorker<InMemoryModelStore, InMemoryLedger, ManualClock> {
        self.worker_with(self.config())
    }

    pub fn worker_with(
        &self,
        config: WorkerConfig,
    ) -> MintWorker<InMemoryModelStore, InMemoryLedger, ManualClock> {
        MintWorker::with_parts(
            self.store.clone(),
            self.ledger.clone(),
            self.clock.clone(),
            config,
        )
    }

    /// A draft work owned by [`OWNER`] with metadata set.
    pub fn draft(&self) -> Work {
        let work = Work::draft(WalletAddress::new(OWNER), "The Lighthouse", self.clock.now())
            .with_metadata_uri(METADATA);
        self.works().create(&work).unwrap();
        work
    }

    /// A draft work published by its owner; returns the work id.
    pub fn published(&self) -> WorkId {
        let work = self.draft();
        self.publisher.publish(work.id.as_str(), &owner()).unwrap();
        work.id
    }

    /// Overwrite a work as an authoring collaborator would.
    pub fn store_work(&self, work: &Work) {
        self.store.save_model(work).unwrap();
    }

    pub fn work(&self, id: &WorkId) -> Work {
        self.works().get(id).unwrap().unwrap()
    }

    /// The single outbox event raised for `id`.
    pub fn event_for(&self, id: &WorkId) -> OutboxEvent {
        let mut events = self.outbox().for_aggregate(id.as_str()).unwrap();
        assert_eq!(events.len(), 1, "expected exactly one event for {}", id);
        events.remove(0)
    }
}

pub fn owner() -> Caller {
    Caller::user("author-1").with_wallet(OWNER)
}

pub fn stranger() -> Caller {
    Caller::user("reader-7").with_wallet(STRANGER)
}
