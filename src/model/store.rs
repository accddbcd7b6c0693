//! ModelStore - Abstract document storage with conditional and atomic writes.

use super::{Model, ModelError, Versioned};

/// Abstract document storage for models.
///
/// Every write is atomic for a single document. `transaction` groups several
/// writes into one unit that commits entirely or not at all.
pub trait ModelStore: Send + Sync {
    /// Handle used to stage writes inside [`ModelStore::transaction`].
    type Tx: ModelTx;

    /// Get a model by ID. Returns None if not found.
    fn get_model<M: Model>(&self, id: &str) -> Result<Option<Versioned<M>>, ModelError>;

    /// Upsert a model (insert or update, no version check).
    fn save_model<M: Model>(&self, model: &M) -> Result<Versioned<M>, ModelError>;

    /// Insert a new model. Fails with `ConcurrencyConflict` if the key exists.
    fn insert_model<M: Model>(&self, model: &M) -> Result<Versioned<M>, ModelError>;

    /// Update an existing model with optimistic concurrency control.
    fn update_model<M: Model>(
        &self,
        model: &M,
        expected_version: u64,
    ) -> Result<Versioned<M>, ModelError>;

    /// Conditionally update one document.
    ///
    /// `update` runs only when the document exists and `filter` accepts it.
    /// Returns the updated document, or None when nothing matched.
    fn update_where<M: Model>(
        &self,
        id: &str,
        filter: &dyn Fn(&M) -> bool,
        update: &mut dyn FnMut(&mut M),
    ) -> Result<Option<Versioned<M>>, ModelError>;

    /// Select the document with the smallest `sort_key` among those accepted
    /// by `filter` and update it, as one atomic step.
    ///
    /// Under concurrent callers each matching document is handed to at most
    /// one of them.
    fn find_one_and_update<M: Model, K: Ord>(
        &self,
        filter: &dyn Fn(&M) -> bool,
        sort_key: &dyn Fn(&M) -> K,
        update: &mut dyn FnMut(&mut M),
    ) -> Result<Option<Versioned<M>>, ModelError>;

    /// Find models matching a predicate.
    fn find_models<M: Model>(
        &self,
        predicate: &dyn Fn(&M) -> bool,
    ) -> Result<Vec<Versioned<M>>, ModelError>;

    /// Run `f` as one atomic unit.
    ///
    /// Writes staged through the transaction handle become visible only if
    /// `f` returns `Ok`; on `Err` every staged write is discarded.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx) -> Result<T, E>,
        E: From<ModelError>;
}

/// Operations available inside an atomic unit.
pub trait ModelTx {
    fn get_model<M: Model>(&self, id: &str) -> Result<Option<Versioned<M>>, ModelError>;

    fn insert_model<M: Model>(&mut self, model: &M) -> Result<Versioned<M>, ModelError>;

    fn update_where<M: Model>(
        &mut self,
        id: &str,
        filter: &dyn Fn(&M) -> bool,
        update: &mut dyn FnMut(&mut M),
    ) -> Result<Option<Versioned<M>>, ModelError>;
}
