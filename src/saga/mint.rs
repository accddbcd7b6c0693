use std::time::SystemTime;

use tracing::{debug, info, warn};

use super::{IntentStatus, IntentStore};
use crate::chain::{minted_token_id, BlockchainAdapter, TokenId, TxHash, TxStatus};
use crate::error::Error;
use crate::model::ModelStore;
use crate::outbox::MintRequested;
use crate::work::WorkStore;

/// How a [`MintSaga::handle`] call ended when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SagaOutcome {
    /// The mint was confirmed on this call.
    Confirmed { token_id: TokenId, tx_hash: TxHash },
    /// The intent was already terminal. Nothing was called or written.
    AlreadyTerminal(IntentStatus),
}

/// Drives one work's mint to a terminal outcome.
///
/// Each call resumes the work's [`MintIntent`](super::MintIntent):
///
/// - `pending`: submit the mint, then persist the handle as `submitted`
/// - `submitted`: poll the receipt. No receipt is [`Error::StillPending`];
///   success confirms the intent and marks the work minted; a revert fails
///   both and surfaces [`Error::Reverted`]
/// - `confirmed` / `failed`: no-op
pub struct MintSaga<S, A> {
    works: WorkStore<S>,
    intents: IntentStore<S>,
    adapter: A,
}

impl<S, A> MintSaga<S, A>
where
    S: ModelStore + Clone,
    A: BlockchainAdapter,
{
    pub fn new(store: S, adapter: A) -> Self {
        Self {
            works: WorkStore::new(store.clone()),
            intents: IntentStore::new(store),
            adapter,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn handle(&self, mint: &MintRequested, now: SystemTime) -> Result<SagaOutcome, Error> {
        let mut intent = self.intents.get_or_create(&mint.work_id, now)?;

        if intent.data.status.is_terminal() {
            debug!(
                work_id = %mint.work_id,
                status = ?intent.data.status,
                "mint intent already terminal"
            );
            return Ok(SagaOutcome::AlreadyTerminal(intent.data.status));
        }

        if intent.data.status == IntentStatus::Pending {
            info!(work_id = %mint.work_id, to = %mint.owner_wallet, "submitting mint");
            let tx_hash = self
                .adapter
                .submit_mint(mint.owner_wallet.as_str(), &mint.metadata_uri)?;
            intent = self.intents.mark_submitted(&intent, &tx_hash)?;
            info!(work_id = %mint.work_id, tx_hash = %tx_hash, "mint submitted");
        }

        let tx_hash = intent
            .data
            .tx_hash
            .clone()
            .ok_or_else(|| Error::InconsistentIntent(intent.data.intent_id.clone()))?;

        match self.adapter.transaction_status(&tx_hash)? {
            TxStatus::Pending { block_number } => {
                debug!(work_id = %mint.work_id, tx_hash = %tx_hash, "mint not mined yet");
                Err(Error::StillPending {
                    tx_hash,
                    block_number,
                })
            }
            TxStatus::Confirmed { block_number, logs } => {
                let token_id = minted_token_id(&logs).ok_or_else(|| Error::MissingTokenId {
                    tx_hash: tx_hash.clone(),
                })?;
                // Work first: a terminal intent is never revisited.
                self.works.mark_minted(&mint.work_id, &token_id, &tx_hash)?;
                self.intents.mark_confirmed(&intent, &token_id)?;
                info!(
                    work_id = %mint.work_id,
                    tx_hash = %tx_hash,
                    token_id = %token_id,
                    block_number,
                    "mint confirmed"
                );
                Ok(SagaOutcome::Confirmed { token_id, tx_hash })
            }
            TxStatus::Reverted { block_number } => {
                self.works.mark_failed(&mint.work_id)?;
                self.intents.mark_failed(&intent)?;
                warn!(
                    work_id = %mint.work_id,
                    tx_hash = %tx_hash,
                    block_number = ?block_number,
                    "mint reverted on-chain"
                );
                Err(Error::Reverted { tx_hash })
            }
        }
    }
}
