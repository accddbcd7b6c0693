//! Minting saga - per-work state machine that drives the ledger to a
//! terminal outcome.
//!
//! The saga's working memory is a [`MintIntent`] keyed by [`intent_key`],
//! so repeated deliveries of the same `MintRequested` event resume one record
//! instead of starting a new mint. A mint is submitted only while the intent
//! is `pending`, and the returned handle is persisted before the receipt is
//! ever polled.
//!
//! ```text
//! pending --submit--> submitted --receipt ok--> confirmed
//!                         |
//!                         +--reverted--> failed
//! ```
//!
//! A crash between a successful submit and the `submitted` write leaves the
//! intent `pending`; the next delivery submits again.

mod intent;
mod mint;

pub use intent::{intent_key, IntentStatus, IntentStore, MintIntent};
pub use mint::{MintSaga, SagaOutcome};
