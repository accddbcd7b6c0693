use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::{debug, error, info, warn};

use crate::chain::BlockchainAdapter;
use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::model::{ModelError, ModelStore};
use crate::outbox::{EventPayload, OutboxEvent, OutboxStore};
use crate::saga::{MintSaga, SagaOutcome};
use crate::settings::WorkerConfig;

/// Counters kept by a [`MintWorker`] across ticks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub polls: usize,
    /// Ticks that found nothing to claim.
    pub idle: usize,
    pub completed: usize,
    pub requeued: usize,
    pub failed: usize,
    /// Claimed events of an unknown type, left in `processing`.
    pub unresolved: usize,
    pub reclaimed: usize,
    pub claim_errors: usize,
}

/// What a single [`MintWorker::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was pending.
    Idle,
    Completed,
    /// Back to `pending`. `transient` requeues leave the attempt counter alone.
    Requeued { transient: bool },
    /// Parked as `failed`.
    Failed,
    /// Unknown event type: left claimed.
    Unresolved,
    /// The store could not be reached; retried next tick.
    StoreUnavailable,
}

/// Outbox consumer: claim one event, run the saga, finalize the event.
///
/// ## Example
///
/// ```ignore
/// let mut worker = MintWorker::new(store.clone(), ledger);
/// while worker.tick() != TickOutcome::Idle {}
/// ```
pub struct MintWorker<S, A, C = SystemClock> {
    outbox: OutboxStore<S>,
    saga: MintSaga<S, A>,
    clock: C,
    config: WorkerConfig,
    stats: WorkerStats,
}

impl<S, A> MintWorker<S, A, SystemClock>
where
    S: ModelStore + Clone,
    A: BlockchainAdapter,
{
    pub fn new(store: S, adapter: A) -> Self {
        Self::with_parts(store, adapter, SystemClock, WorkerConfig::default())
    }

    pub fn with_config(store: S, adapter: A, config: WorkerConfig) -> Self {
        Self::with_parts(store, adapter, SystemClock, config)
    }
}

impl<S, A, C> MintWorker<S, A, C>
where
    S: ModelStore + Clone,
    A: BlockchainAdapter,
    C: Clock,
{
    pub fn with_parts(store: S, adapter: A, clock: C, config: WorkerConfig) -> Self {
        Self {
            outbox: OutboxStore::new(store.clone()),
            saga: MintSaga::new(store, adapter),
            clock,
            config,
            stats: WorkerStats::default(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    pub fn adapter(&self) -> &A {
        self.saga.adapter()
    }

    /// Run one iteration. Never fails: every error ends up in the event's
    /// status, attempts and last error, or in the logs.
    pub fn tick(&mut self) -> TickOutcome {
        self.stats.polls += 1;
        let now = self.clock.now();

        if let Some(after) = self.config.reclaim_after {
            match self.outbox.reclaim_stalled(now, after) {
                Ok(0) => {}
                Ok(count) => {
                    self.stats.reclaimed += count;
                    warn!(worker_id = %self.config.worker_id, count, "requeued stalled events");
                }
                Err(e) => {
                    error!(
                        worker_id = %self.config.worker_id,
                        error = %e,
                        "stalled event sweep failed"
                    );
                }
            }
        }

        let event = match self.outbox.claim(now) {
            Ok(Some(event)) => event,
            Ok(None) => {
                self.stats.idle += 1;
                return TickOutcome::Idle;
            }
            Err(e) => {
                self.stats.claim_errors += 1;
                error!(
                    worker_id = %self.config.worker_id,
                    error = %e,
                    "failed to claim outbox event"
                );
                return TickOutcome::StoreUnavailable;
            }
        };

        debug!(
            worker_id = %self.config.worker_id,
            event_id = %event.id,
            event_type = %event.event_type,
            attempts = event.attempts,
            "claimed outbox event"
        );

        let result = match event.decode() {
            Ok(Some(EventPayload::MintRequested(mint))) => self.saga.handle(&mint, now),
            Ok(None) => {
                self.stats.unresolved += 1;
                warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "unknown event type, leaving event unresolved"
                );
                return TickOutcome::Unresolved;
            }
            Err(e) => Err(e),
        };

        self.finalize(&event, result)
    }

    /// Tick until `stop` fires (or its sender is dropped), sleeping
    /// `poll_interval` after every tick.
    pub fn run(&mut self, stop: &Receiver<()>) -> WorkerStats {
        info!(
            worker_id = %self.config.worker_id,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "mint worker started"
        );

        loop {
            match stop.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            self.tick();
            self.clock.sleep(self.config.poll_interval);
        }

        info!(worker_id = %self.config.worker_id, stats = ?self.stats, "mint worker stopped");
        self.stats.clone()
    }

    fn finalize(&mut self, event: &OutboxEvent, result: Result<SagaOutcome, Error>) -> TickOutcome {
        let err = match result {
            Ok(outcome) => {
                debug!(event_id = %event.id, outcome = ?outcome, "saga finished");
                let written = self.outbox.complete(&event.id);
                return self.record(event, written, TickOutcome::Completed);
            }
            Err(err) => err,
        };

        let message = truncate_error(&err.to_string(), self.config.max_error_len);

        if err.is_transient() {
            debug!(event_id = %event.id, reason = %message, "mint still pending, requeueing");
            let written = self.outbox.requeue(&event.id, event.attempts, &message);
            return self.record(event, written, TickOutcome::Requeued { transient: true });
        }

        let attempts = event.attempts.saturating_add(1);
        if attempts >= self.config.max_attempts || err.is_permanent() {
            error!(
                event_id = %event.id,
                attempts,
                error = %message,
                "outbox event failed permanently"
            );
            let written = self.outbox.fail(&event.id, attempts, &message);
            self.record(event, written, TickOutcome::Failed)
        } else {
            warn!(
                event_id = %event.id,
                attempts,
                error = %message,
                "outbox event failed, will retry"
            );
            let written = self.outbox.requeue(&event.id, attempts, &message);
            self.record(event, written, TickOutcome::Requeued { transient: false })
        }
    }

    fn record(
        &mut self,
        event: &OutboxEvent,
        written: Result<bool, ModelError>,
        outcome: TickOutcome,
    ) -> TickOutcome {
        match written {
            Ok(true) => {
                match outcome {
                    TickOutcome::Completed => self.stats.completed += 1,
                    TickOutcome::Requeued { .. } => self.stats.requeued += 1,
                    TickOutcome::Failed => self.stats.failed += 1,
                    _ => {}
                }
                outcome
            }
            Ok(false) => {
                warn!(
                    event_id = %event.id,
                    "event no longer processing, outcome not recorded"
                );
                outcome
            }
            Err(e) => {
                error!(event_id = %event.id, error = %e, "failed to finalize outbox event");
                TickOutcome::StoreUnavailable
            }
        }
    }
}

/// Cut `message` to at most `max` characters.
fn truncate_error(message: &str, max: usize) -> String {
    match message.char_indices().nth(max) {
        Some((end, _)) => message[..end].to_string(),
        None => message.to_string(),
    }
}
