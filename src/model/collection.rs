use std::marker::PhantomData;

use super::{Model, ModelError, ModelStore, Versioned};

/// One collection of a [`ModelStore`], typed by its model.
pub struct Collection<'a, S, M> {
    store: &'a S,
    _model: PhantomData<M>,
}

impl<'a, S: ModelStore, M: Model> Collection<'a, S, M> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            _model: PhantomData,
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<Versioned<M>>, ModelError> {
        self.store.get_model(id)
    }

    /// Like [`get`](Self::get), without the version.
    pub fn load(&self, id: &str) -> Result<Option<M>, ModelError> {
        Ok(self.get(id)?.map(|versioned| versioned.data))
    }

    /// Fails with `ConcurrencyConflict` if the id is taken.
    pub fn insert(&self, model: &M) -> Result<Versioned<M>, ModelError> {
        self.store.insert_model(model)
    }

    pub fn update(&self, model: &M, expected_version: u64) -> Result<Versioned<M>, ModelError> {
        self.store.update_model(model, expected_version)
    }

    pub fn update_where(
        &self,
        id: &str,
        filter: &dyn Fn(&M) -> bool,
        update: &mut dyn FnMut(&mut M),
    ) -> Result<Option<Versioned<M>>, ModelError> {
        self.store.update_where(id, filter, update)
    }

    pub fn find_one_and_update<K: Ord>(
        &self,
        filter: &dyn Fn(&M) -> bool,
        sort_key: &dyn Fn(&M) -> K,
        update: &mut dyn FnMut(&mut M),
    ) -> Result<Option<Versioned<M>>, ModelError> {
        self.store.find_one_and_update(filter, sort_key, update)
    }

    pub fn find(&self, predicate: &dyn Fn(&M) -> bool) -> Result<Vec<Versioned<M>>, ModelError> {
        self.store.find_models(predicate)
    }

    /// Matching models ordered by `sort_key`, versions dropped.
    pub fn find_sorted<K: Ord>(
        &self,
        predicate: &dyn Fn(&M) -> bool,
        sort_key: impl Fn(&M) -> K,
    ) -> Result<Vec<M>, ModelError> {
        let mut models: Vec<M> = self
            .find(predicate)?
            .into_iter()
            .map(|versioned| versioned.data)
            .collect();
        models.sort_by_key(|model| sort_key(model));
        Ok(models)
    }
}

/// Typed access to any [`ModelStore`]: `store.models::<Work>().get(id)`.
pub trait ModelsExt: ModelStore + Sized {
    fn models<M: Model>(&self) -> Collection<'_, Self, M> {
        Collection::new(self)
    }
}

impl<S: ModelStore> ModelsExt for S {}
