//! Worker loop - drains the outbox through the minting saga.
//!
//! Each tick claims one event, dispatches it by type and finalizes it:
//!
//! - saga finished (or nothing left to do): `completed`
//! - mint still pending: back to `pending`, attempts unchanged
//! - any other error: attempts + 1, then `failed` once the poison threshold
//!   is reached (or immediately for a misconfigured adapter), else `pending`
//!
//! The loop sleeps a fixed interval between ticks whatever the outcome.

mod mint;
mod thread;

pub use mint::{MintWorker, TickOutcome, WorkerStats};
pub use thread::MintWorkerThread;
