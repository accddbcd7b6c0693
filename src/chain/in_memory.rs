use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{is_address, AdapterError, BlockchainAdapter, ReceiptLog, TxHash, TxStatus};

const LEDGER_CONTRACT: &str = "0x00000000000000000000000000000000000f1a7e";
const MINT_FROM: &str = "0x0000000000000000000000000000000000000000";

/// A mint submitted to an [`InMemoryLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub tx_hash: TxHash,
    pub to: String,
    pub token_uri: String,
}

#[derive(Default)]
struct LedgerState {
    submissions: Vec<Submission>,
    receipts: HashMap<TxHash, VecDeque<TxStatus>>,
    submit_faults: VecDeque<AdapterError>,
    status_faults: VecDeque<AdapterError>,
    status_calls: usize,
    next_token_id: u128,
    next_block: u64,
    auto_mine: bool,
}

/// Scripted in-process ledger.
///
/// Submitted transactions stay pending until they are mined, reverted or
/// scripted. Clones share the same ledger, so a test can keep a handle while
/// the worker owns another.
///
/// ## Example
///
/// ```ignore
/// let ledger = InMemoryLedger::new();
/// let tx = ledger.submit_mint(owner, "ipfs://meta")?;
/// ledger.mine(&tx, 42);
/// assert!(matches!(ledger.transaction_status(&tx)?, TxStatus::Confirmed { .. }));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirm every submission immediately with the next free token id.
    pub fn auto_mining(self) -> Self {
        self.lock().auto_mine = true;
        self
    }

    /// Confirm `tx_hash` with a `Transfer` log carrying `token_id`.
    pub fn mine(&self, tx_hash: &TxHash, token_id: u128) {
        let mut state = self.lock();
        let to = state
            .submissions
            .iter()
            .find(|s| &s.tx_hash == tx_hash)
            .map(|s| s.to.clone())
            .unwrap_or_else(|| MINT_FROM.to_string());
        let status = confirmed(&mut state, &to, token_id);
        state.receipts.insert(tx_hash.clone(), VecDeque::from([status]));
    }

    /// Mark `tx_hash` as mined and reverted.
    pub fn revert(&self, tx_hash: &TxHash) {
        let mut state = self.lock();
        state.next_block += 1;
        let block_number = Some(state.next_block);
        state
            .receipts
            .insert(tx_hash.clone(), VecDeque::from([TxStatus::Reverted { block_number }]));
    }

    /// Answer successive status queries for `tx_hash` with `statuses`.
    /// The last status keeps being returned once the script runs out.
    pub fn script(&self, tx_hash: &TxHash, statuses: impl IntoIterator<Item = TxStatus>) {
        self.lock()
            .receipts
            .insert(tx_hash.clone(), statuses.into_iter().collect());
    }

    /// Make the next `submit_mint` call fail with `error`.
    pub fn fail_next_submit(&self, error: AdapterError) {
        self.lock().submit_faults.push_back(error);
    }

    /// Make the next `transaction_status` call fail with `error`.
    pub fn fail_next_status(&self, error: AdapterError) {
        self.lock().status_faults.push_back(error);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    pub fn submit_count(&self) -> usize {
        self.lock().submissions.len()
    }

    pub fn status_calls(&self) -> usize {
        self.lock().status_calls
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn confirmed(state: &mut LedgerState, to: &str, token_id: u128) -> TxStatus {
    state.next_block += 1;
    TxStatus::Confirmed {
        block_number: state.next_block,
        logs: vec![ReceiptLog::transfer(LEDGER_CONTRACT, MINT_FROM, to, token_id)],
    }
}

impl BlockchainAdapter for InMemoryLedger {
    fn submit_mint(&self, to: &str, token_uri: &str) -> Result<TxHash, AdapterError> {
        let mut state = self.lock();
        if let Some(fault) = state.submit_faults.pop_front() {
            return Err(fault);
        }
        if !is_address(to) {
            return Err(AdapterError::InvalidAddress(to.to_string()));
        }

        let nonce = state.submissions.len() as u64 + 1;
        let tx_hash = TxHash::new(format!("0x{:064x}", nonce));
        state.submissions.push(Submission {
            tx_hash: tx_hash.clone(),
            to: to.to_string(),
            token_uri: token_uri.to_string(),
        });

        if state.auto_mine {
            state.next_token_id += 1;
            let token_id = state.next_token_id;
            let status = confirmed(&mut state, to, token_id);
            state.receipts.insert(tx_hash.clone(), VecDeque::from([status]));
        }

        Ok(tx_hash)
    }

    fn transaction_status(&self, tx_hash: &TxHash) -> Result<TxStatus, AdapterError> {
        let mut state = self.lock();
        state.status_calls += 1;
        if let Some(fault) = state.status_faults.pop_front() {
            return Err(fault);
        }

        let status = match state.receipts.get_mut(tx_hash) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(status.unwrap_or(TxStatus::Pending { block_number: None }))
    }
}
