//! Outbox - Durable queue of domain events awaiting processing.
//!
//! Producers write an [`OutboxEvent`] in the same atomic unit as the state
//! change that requires it. Workers claim events one at a time with a single
//! atomic find-and-update and finalize them as completed, requeued or failed.
//!
//! ```text
//! pending --claim--> processing --complete--> completed
//!    ^                    |
//!    +------requeue-------+--fail--> failed
//! ```

mod event;
mod store;

pub use event::{EventPayload, MintRequested, OutboxEvent, OutboxStatus};
pub use store::OutboxStore;
