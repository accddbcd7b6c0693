use tracing::warn;

use super::{Work, WorkId, WorkStatus};
use crate::chain::{TokenId, TxHash};
use crate::model::{ModelError, ModelStore, ModelsExt};

/// Typed access to works in a [`ModelStore`].
///
/// Saga-side transitions are conditional on `status == publishing`, so a
/// late or duplicated saga step can never move a work out of another state.
#[derive(Clone)]
pub struct WorkStore<S> {
    store: S,
}

impl<S: ModelStore> WorkStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist a new work (used by authoring collaborators).
    pub fn create(&self, work: &Work) -> Result<(), ModelError> {
        self.store.models::<Work>().insert(work)?;
        Ok(())
    }

    pub fn get(&self, id: &WorkId) -> Result<Option<Work>, ModelError> {
        self.store.models::<Work>().load(id.as_str())
    }

    /// `publishing -> minted`, attaching the token id and transaction handle.
    /// Returns false when the work was not publishing.
    pub fn mark_minted(
        &self,
        id: &WorkId,
        token_id: &TokenId,
        tx_hash: &TxHash,
    ) -> Result<bool, ModelError> {
        let updated = self.store.models::<Work>().update_where(
            id.as_str(),
            &|work| work.status == WorkStatus::Publishing,
            &mut |work| {
                work.status = WorkStatus::Minted;
                work.nft_token_id = Some(token_id.clone());
                work.nft_tx_hash = Some(tx_hash.clone());
            },
        )?;
        if updated.is_none() {
            warn!(work_id = %id, "work not in publishing state, mint outcome not recorded");
        }
        Ok(updated.is_some())
    }

    /// `publishing -> failed`. Returns false when the work was not publishing.
    pub fn mark_failed(&self, id: &WorkId) -> Result<bool, ModelError> {
        let updated = self.store.models::<Work>().update_where(
            id.as_str(),
            &|work| work.status == WorkStatus::Publishing,
            &mut |work| work.status = WorkStatus::Failed,
        )?;
        if updated.is_none() {
            warn!(work_id = %id, "work not in publishing state, failure not recorded");
        }
        Ok(updated.is_some())
    }
}
