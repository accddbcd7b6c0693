//! Transactional outbox and minting saga for publishing works as on-chain
//! tokens.
//!
//! - [`PublishService`] flips a draft work to `publishing` and records a
//!   `MintRequested` event in the same atomic unit.
//! - [`OutboxStore`] keeps those events until a worker claims them.
//! - [`MintSaga`] drives each work's mint through a [`BlockchainAdapter`]
//!   to `minted` or `failed`, resuming the same [`MintIntent`] on every
//!   delivery.
//! - [`MintWorker`] ties them together in a polling loop with a retry and
//!   poison policy; [`MintWorkerThread`] runs it in the background.

pub mod chain;
mod clock;
mod error;
pub mod model;
mod outbox;
mod publish;
mod saga;
mod settings;
mod work;
mod worker;

pub use chain::{
    minted_token_id, AdapterError, BlockchainAdapter, InMemoryLedger, ReceiptLog, Submission,
    TokenId, TxHash, TxStatus,
};
#[cfg(feature = "ethers")]
pub use chain::EthersAdapter;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, ErrorKind};
pub use model::{InMemoryModelStore, Model, ModelError, ModelStore, ModelsExt, Versioned};
pub use outbox::{EventPayload, MintRequested, OutboxEvent, OutboxStatus, OutboxStore};
pub use publish::{Caller, PublishReceipt, PublishService};
pub use saga::{intent_key, IntentStatus, IntentStore, MintIntent, MintSaga, SagaOutcome};
pub use settings::{ChainConfig, WorkerConfig, ENV_PREFIX};
pub use work::{WalletAddress, Work, WorkId, WorkStatus, WorkStore};
pub use worker::{MintWorker, MintWorkerThread, TickOutcome, WorkerStats};
