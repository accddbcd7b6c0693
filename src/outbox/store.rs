use std::time::{Duration, SystemTime};

use super::{EventPayload, OutboxEvent, OutboxStatus};
use crate::error::Error;
use crate::model::{ModelError, ModelStore, ModelsExt};

/// Durable queue of outbox events on top of a [`ModelStore`].
///
/// Claiming is a single atomic find-and-update, so any number of workers can
/// share one store without an external lock manager. Finalize operations
/// only apply to events that are still `processing`.
#[derive(Clone)]
pub struct OutboxStore<S> {
    store: S,
}

impl<S: ModelStore> OutboxStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Enqueue a standalone event outside of any producer transaction.
    pub fn enqueue(&self, payload: &EventPayload, now: SystemTime) -> Result<OutboxEvent, Error> {
        let event = OutboxEvent::new(payload, now)?;
        self.store.models::<OutboxEvent>().insert(&event)?;
        Ok(event)
    }

    pub fn get(&self, id: &str) -> Result<Option<OutboxEvent>, ModelError> {
        self.store.models::<OutboxEvent>().load(id)
    }

    /// All events with `status`, oldest first.
    pub fn by_status(&self, status: OutboxStatus) -> Result<Vec<OutboxEvent>, ModelError> {
        self.store
            .models::<OutboxEvent>()
            .find_sorted(&|event| event.status == status, queue_order)
    }

    /// All events raised for `aggregate_id`, oldest first.
    pub fn for_aggregate(&self, aggregate_id: &str) -> Result<Vec<OutboxEvent>, ModelError> {
        self.store
            .models::<OutboxEvent>()
            .find_sorted(&|event| event.aggregate_id == aggregate_id, queue_order)
    }

    /// Claim the oldest pending event, moving it to `processing`.
    ///
    /// Returns None when nothing is pending.
    pub fn claim(&self, now: SystemTime) -> Result<Option<OutboxEvent>, ModelError> {
        let claimed = self.store.models::<OutboxEvent>().find_one_and_update(
            &|event| event.is_pending(),
            &queue_order,
            &mut |event| {
                event.status = OutboxStatus::Processing;
                event.processed_at = Some(now);
            },
        )?;
        Ok(claimed.map(|versioned| versioned.data))
    }

    /// `processing -> completed`. Returns false if the event was not processing.
    pub fn complete(&self, id: &str) -> Result<bool, ModelError> {
        self.finalize(id, |event| {
            event.status = OutboxStatus::Completed;
        })
    }

    /// `processing -> pending` for a later tick.
    pub fn requeue(&self, id: &str, attempts: u32, error: &str) -> Result<bool, ModelError> {
        self.finalize(id, |event| {
            event.status = OutboxStatus::Pending;
            event.attempts = event.attempts.max(attempts);
            event.last_error = Some(error.to_string());
        })
    }

    /// `processing -> failed`, parking the event for an operator.
    pub fn fail(&self, id: &str, attempts: u32, error: &str) -> Result<bool, ModelError> {
        self.finalize(id, |event| {
            event.status = OutboxStatus::Failed;
            event.attempts = event.attempts.max(attempts);
            event.last_error = Some(error.to_string());
        })
    }

    /// Requeue events claimed at or before `now - older_than`.
    ///
    /// Only known event types are swept. Unknown ones stay in `processing`
    /// until something that understands them resolves them.
    ///
    /// The attempt counter is left alone: a stalled claim says nothing about
    /// the event itself. Returns the number of events requeued.
    pub fn reclaim_stalled(
        &self,
        now: SystemTime,
        older_than: Duration,
    ) -> Result<usize, ModelError> {
        let Some(cutoff) = now.checked_sub(older_than) else {
            return Ok(0);
        };
        let is_stalled = move |event: &OutboxEvent| {
            event.is_processing()
                && EventPayload::KNOWN_TYPES.contains(&event.event_type.as_str())
                && event
                    .processed_at
                    .map(|claimed_at| claimed_at <= cutoff)
                    .unwrap_or(true)
        };

        let models = self.store.models::<OutboxEvent>();
        let mut reclaimed = 0;
        for stalled in models.find(&is_stalled)? {
            let requeued = models.update_where(&stalled.data.id, &is_stalled, &mut |event| {
                event.status = OutboxStatus::Pending;
                event.last_error = Some("reclaimed after stalled claim".to_string());
            })?;
            if requeued.is_some() {
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    fn finalize<F>(&self, id: &str, mut apply: F) -> Result<bool, ModelError>
    where
        F: FnMut(&mut OutboxEvent),
    {
        let updated = self.store.models::<OutboxEvent>().update_where(
            id,
            &|event| event.is_processing(),
            &mut apply,
        )?;
        Ok(updated.is_some())
    }
}

/// Claim order: oldest first, ties broken by id.
fn queue_order(event: &OutboxEvent) -> (SystemTime, String) {
    (event.created_at, event.id.clone())
}
