//! Blockchain boundary - the ledger the minting saga drives.
//!
//! The saga only talks to the ledger through [`BlockchainAdapter`]:
//! one call to submit a mint and one to poll the transaction's status.
//!
//! - `InMemoryLedger` - scripted in-process ledger for tests and local runs
//! - `EthersAdapter` - JSON-RPC adapter for an ERC-721 contract (requires the `ethers` feature)

mod in_memory;
mod receipt;
#[cfg(feature = "ethers")]
mod rpc;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use in_memory::{InMemoryLedger, Submission};
pub use receipt::{minted_token_id, ReceiptLog, TRANSFER_TOPIC};
#[cfg(feature = "ethers")]
pub use rpc::EthersAdapter;

/// Handle of a submitted ledger transaction (`0x`-prefixed hex).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minted token id, as a decimal string (token ids are 256-bit).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a submitted transaction as reported by the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// No receipt yet: the transaction has not been mined.
    Pending { block_number: Option<u64> },
    /// Mined and succeeded. Logs are exposed so the token id can be recovered.
    Confirmed {
        block_number: u64,
        logs: Vec<ReceiptLog>,
    },
    /// Mined and reverted.
    Reverted { block_number: Option<u64> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Endpoint, signing key or contract address is missing or malformed.
    #[error("blockchain config error: {0}")]
    Misconfigured(String),
    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),
    #[error("blockchain network error: {0}")]
    Network(String),
    /// The ledger refused the call (e.g. estimation failure, nonce issue).
    #[error("blockchain rejected call: {0}")]
    Rejected(String),
}

/// External ledger used by the minting saga.
///
/// Implementations must distinguish "not yet mined" from "mined and reverted"
/// from "mined and succeeded". Neither call is expected to be idempotent:
/// every successful `submit_mint` puts a new transaction on the ledger.
pub trait BlockchainAdapter: Send + Sync {
    /// Submit a mint of `token_uri` to `to`. Returns the transaction handle.
    fn submit_mint(&self, to: &str, token_uri: &str) -> Result<TxHash, AdapterError>;

    /// Look up the transaction's receipt.
    fn transaction_status(&self, tx_hash: &TxHash) -> Result<TxStatus, AdapterError>;
}

impl<A: BlockchainAdapter + ?Sized> BlockchainAdapter for std::sync::Arc<A> {
    fn submit_mint(&self, to: &str, token_uri: &str) -> Result<TxHash, AdapterError> {
        (**self).submit_mint(to, token_uri)
    }

    fn transaction_status(&self, tx_hash: &TxHash) -> Result<TxStatus, AdapterError> {
        (**self).transaction_status(tx_hash)
    }
}

/// Whether `value` is a `0x`-prefixed, 20-byte hex address.
pub fn is_address(value: &str) -> bool {
    is_prefixed_hex(value, 20)
}

pub(crate) fn is_prefixed_hex(value: &str, bytes: usize) -> bool {
    let Some(digits) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    else {
        return false;
    };
    digits.len() == bytes * 2 && digits.chars().all(|c| c.is_ascii_hexdigit())
}
