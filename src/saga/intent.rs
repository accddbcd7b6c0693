use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::chain::{TokenId, TxHash};
use crate::model::{Model, ModelError, ModelStore, ModelsExt, Versioned};
use crate::work::WorkId;

/// Deterministic intent key for a work: `mint_<work id>`.
pub fn intent_key(work_id: &WorkId) -> String {
    format!("mint_{}", work_id)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    #[default]
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

impl IntentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, IntentStatus::Confirmed | IntentStatus::Failed)
    }
}

/// Working memory of the minting saga for one work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MintIntent {
    pub intent_id: String,
    pub work_id: WorkId,
    pub status: IntentStatus,
    pub tx_hash: Option<TxHash>,
    pub token_id: Option<TokenId>,
    pub created_at: SystemTime,
}

impl Model for MintIntent {
    const COLLECTION: &'static str = "mint_intents";

    fn id(&self) -> &str {
        &self.intent_id
    }
}

impl MintIntent {
    pub fn new(work_id: WorkId, created_at: SystemTime) -> Self {
        Self {
            intent_id: intent_key(&work_id),
            work_id,
            status: IntentStatus::Pending,
            tx_hash: None,
            token_id: None,
            created_at,
        }
    }
}

/// Typed access to mint intents.
///
/// Transitions are optimistic writes against the version the caller read,
/// so two saga runs racing on one intent cannot both advance it.
#[derive(Clone)]
pub struct IntentStore<S> {
    store: S,
}

impl<S: ModelStore> IntentStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get(&self, work_id: &WorkId) -> Result<Option<Versioned<MintIntent>>, ModelError> {
        self.store.models::<MintIntent>().get(&intent_key(work_id))
    }

    /// Load the intent for `work_id`, creating a pending one if none exists.
    ///
    /// Creation relies on the key's uniqueness: a racing creator loses the
    /// insert and reads the winner's record instead.
    pub fn get_or_create(
        &self,
        work_id: &WorkId,
        now: SystemTime,
    ) -> Result<Versioned<MintIntent>, ModelError> {
        if let Some(existing) = self.get(work_id)? {
            return Ok(existing);
        }

        let intent = MintIntent::new(work_id.clone(), now);
        match self.store.models::<MintIntent>().insert(&intent) {
            Ok(created) => Ok(created),
            Err(ModelError::ConcurrencyConflict { .. }) => {
                self.get(work_id)?.ok_or_else(|| ModelError::NotFound {
                    collection: MintIntent::COLLECTION.to_string(),
                    id: intent.intent_id.clone(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// `pending -> submitted`, recording the transaction handle.
    pub fn mark_submitted(
        &self,
        intent: &Versioned<MintIntent>,
        tx_hash: &TxHash,
    ) -> Result<Versioned<MintIntent>, ModelError> {
        let mut next = intent.data.clone();
        next.status = IntentStatus::Submitted;
        next.tx_hash = Some(tx_hash.clone());
        self.store.models::<MintIntent>().update(&next, intent.version)
    }

    /// `submitted -> confirmed`, recording the minted token id.
    pub fn mark_confirmed(
        &self,
        intent: &Versioned<MintIntent>,
        token_id: &TokenId,
    ) -> Result<Versioned<MintIntent>, ModelError> {
        let mut next = intent.data.clone();
        next.status = IntentStatus::Confirmed;
        next.token_id = Some(token_id.clone());
        self.store.models::<MintIntent>().update(&next, intent.version)
    }

    /// `submitted -> failed`.
    pub fn mark_failed(
        &self,
        intent: &Versioned<MintIntent>,
    ) -> Result<Versioned<MintIntent>, ModelError> {
        let mut next = intent.data.clone();
        next.status = IntentStatus::Failed;
        self.store.models::<MintIntent>().update(&next, intent.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InMemoryModelStore;

    #[test]
    fn key_is_derived_from_work_id() {
        let id = WorkId::parse("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(intent_key(&id), "mint_67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn get_or_create_resumes_existing_intent() {
        let intents = IntentStore::new(InMemoryModelStore::new());
        let work_id = WorkId::generate();

        let created = intents.get_or_create(&work_id, SystemTime::UNIX_EPOCH).unwrap();
        assert_eq!(created.data.status, IntentStatus::Pending);

        let submitted = intents.mark_submitted(&created, &TxHash::new("0xabc")).unwrap();
        let resumed = intents.get_or_create(&work_id, SystemTime::now()).unwrap();

        assert_eq!(resumed, submitted);
        assert_eq!(resumed.data.created_at, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn stale_transition_is_a_conflict() {
        let intents = IntentStore::new(InMemoryModelStore::new());
        let work_id = WorkId::generate();
        let read = intents.get_or_create(&work_id, SystemTime::UNIX_EPOCH).unwrap();

        intents.mark_submitted(&read, &TxHash::new("0x1")).unwrap();
        let err = intents.mark_submitted(&read, &TxHash::new("0x2")).unwrap_err();
        assert!(matches!(err, ModelError::ConcurrencyConflict { .. }));

        let stored = intents.get(&work_id).unwrap().unwrap();
        assert_eq!(stored.data.tx_hash, Some(TxHash::new("0x1")));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!IntentStatus::Pending.is_terminal());
        assert!(!IntentStatus::Submitted.is_terminal());
        assert!(IntentStatus::Confirmed.is_terminal());
        assert!(IntentStatus::Failed.is_terminal());
    }
}
