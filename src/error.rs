use thiserror::Error;

use crate::chain::{AdapterError, TxHash};
use crate::model::ModelError;

/// Classification used by callers and by the worker's retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    Conflict,
    NotFound,
    /// The mint transaction is not final yet. Not counted as a retry.
    TransientExternal,
    /// Chain revert or adapter failure. Counted as a retry.
    TerminalExternal,
    StoreUnavailable,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transaction still pending (block: {})", block_label(.block_number))]
    StillPending {
        tx_hash: TxHash,
        block_number: Option<u64>,
    },
    #[error("transaction {tx_hash} reverted on-chain")]
    Reverted { tx_hash: TxHash },
    #[error("receipt for {tx_hash} carries no Transfer log")]
    MissingTokenId { tx_hash: TxHash },
    #[error("mint intent {0} is submitted without a transaction hash")]
    InconsistentIntent(String),
    #[error("invalid {event_type} payload: {reason}")]
    Payload { event_type: String, reason: String },
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Store(#[from] ModelError),
}

fn block_label(block_number: &Option<u64>) -> String {
    match block_number {
        Some(block) => block.to_string(),
        None => "mempool".to_string(),
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::Payload { .. } => ErrorKind::Validation,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::StillPending { .. } => ErrorKind::TransientExternal,
            Error::Reverted { .. }
            | Error::MissingTokenId { .. }
            | Error::InconsistentIntent(_)
            | Error::Adapter(_) => ErrorKind::TerminalExternal,
            Error::Store(ModelError::ConcurrencyConflict { .. }) => ErrorKind::Conflict,
            Error::Store(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Whether the failure is excluded from retry accounting.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::TransientExternal
    }

    /// Whether retrying can never succeed without operator intervention.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Error::Adapter(AdapterError::Misconfigured(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn still_pending_is_transient() {
        let err = Error::StillPending {
            tx_hash: TxHash::new("0xabc"),
            block_number: None,
        };
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "transaction still pending (block: mempool)");
    }

    #[test]
    fn revert_and_adapter_faults_are_terminal() {
        let reverted = Error::Reverted {
            tx_hash: TxHash::new("0xabc"),
        };
        assert_eq!(reverted.kind(), ErrorKind::TerminalExternal);
        assert!(!reverted.is_transient());

        let network = Error::from(AdapterError::Network("connection refused".into()));
        assert_eq!(network.kind(), ErrorKind::TerminalExternal);
        assert!(!network.is_permanent());
    }

    #[test]
    fn misconfiguration_is_permanent() {
        let err = Error::from(AdapterError::Misconfigured("missing rpc_url".into()));
        assert!(err.is_permanent());
        assert_eq!(err.kind(), ErrorKind::TerminalExternal);
    }

    #[test]
    fn store_errors_classify_by_cause() {
        let unavailable = Error::from(ModelError::Storage("lock poisoned".into()));
        assert_eq!(unavailable.kind(), ErrorKind::StoreUnavailable);

        let conflict = Error::from(ModelError::ConcurrencyConflict {
            collection: "mint_intents".into(),
            id: "mint_1".into(),
            expected: 1,
            actual: 2,
        });
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
    }
}
