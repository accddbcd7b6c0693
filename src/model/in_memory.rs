//! InMemoryModelStore - HashMap-backed model store for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Model, ModelError, ModelStore, ModelTx, Versioned};

/// Internal stored representation of a model.
#[derive(Clone)]
struct StoredModel {
    bytes: Vec<u8>,
    version: u64,
}

type Documents = HashMap<String, StoredModel>;

/// In-memory model store backed by a HashMap.
///
/// Storage key is `"COLLECTION:id"`. Clone-friendly via Arc: clones share
/// the same documents, so several workers can run against one store.
#[derive(Clone)]
pub struct InMemoryModelStore {
    storage: Arc<RwLock<Documents>>,
}

impl Default for InMemoryModelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryModelStore {
    /// Create a new empty model store.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Documents>, ModelError> {
        self.storage
            .read()
            .map_err(|_| ModelError::Storage("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Documents>, ModelError> {
        self.storage
            .write()
            .map_err(|_| ModelError::Storage("lock poisoned".into()))
    }
}

/// Staged writes of an in-flight [`InMemoryModelStore::transaction`].
pub struct InMemoryTransaction {
    staged: Documents,
}

impl ModelTx for InMemoryTransaction {
    fn get_model<M: Model>(&self, id: &str) -> Result<Option<Versioned<M>>, ModelError> {
        get_in(&self.staged, id)
    }

    fn insert_model<M: Model>(&mut self, model: &M) -> Result<Versioned<M>, ModelError> {
        insert_in(&mut self.staged, model)
    }

    fn update_where<M: Model>(
        &mut self,
        id: &str,
        filter: &dyn Fn(&M) -> bool,
        update: &mut dyn FnMut(&mut M),
    ) -> Result<Option<Versioned<M>>, ModelError> {
        update_where_in(&mut self.staged, id, filter, update)
    }
}

impl ModelStore for InMemoryModelStore {
    type Tx = InMemoryTransaction;

    fn get_model<M: Model>(&self, id: &str) -> Result<Option<Versioned<M>>, ModelError> {
        let storage = self.read()?;
        get_in(&storage, id)
    }

    fn save_model<M: Model>(&self, model: &M) -> Result<Versioned<M>, ModelError> {
        let key = make_key(M::COLLECTION, model.id());
        let bytes = encode(model)?;

        let mut storage = self.write()?;
        let new_version = storage.get(&key).map(|s| s.version + 1).unwrap_or(1);
        storage.insert(
            key,
            StoredModel {
                bytes,
                version: new_version,
            },
        );

        Ok(Versioned {
            data: model.clone(),
            version: new_version,
        })
    }

    fn insert_model<M: Model>(&self, model: &M) -> Result<Versioned<M>, ModelError> {
        let mut storage = self.write()?;
        insert_in(&mut storage, model)
    }

    fn update_model<M: Model>(
        &self,
        model: &M,
        expected_version: u64,
    ) -> Result<Versioned<M>, ModelError> {
        let key = make_key(M::COLLECTION, model.id());
        let bytes = encode(model)?;

        let mut storage = self.write()?;

        let actual_version = storage
            .get(&key)
            .map(|s| s.version)
            .ok_or_else(|| ModelError::NotFound {
                collection: M::COLLECTION.to_string(),
                id: model.id().to_string(),
            })?;

        if actual_version != expected_version {
            return Err(ModelError::ConcurrencyConflict {
                collection: M::COLLECTION.to_string(),
                id: model.id().to_string(),
                expected: expected_version,
                actual: actual_version,
            });
        }

        let new_version = actual_version + 1;
        storage.insert(
            key,
            StoredModel {
                bytes,
                version: new_version,
            },
        );

        Ok(Versioned {
            data: model.clone(),
            version: new_version,
        })
    }

    fn update_where<M: Model>(
        &self,
        id: &str,
        filter: &dyn Fn(&M) -> bool,
        update: &mut dyn FnMut(&mut M),
    ) -> Result<Option<Versioned<M>>, ModelError> {
        let mut storage = self.write()?;
        update_where_in(&mut storage, id, filter, update)
    }

    fn find_one_and_update<M: Model, K: Ord>(
        &self,
        filter: &dyn Fn(&M) -> bool,
        sort_key: &dyn Fn(&M) -> K,
        update: &mut dyn FnMut(&mut M),
    ) -> Result<Option<Versioned<M>>, ModelError> {
        let mut storage = self.write()?;

        let prefix = collection_prefix(M::COLLECTION);
        let mut selected: Option<(K, String, M)> = None;

        for (key, stored) in storage.iter() {
            if !key.starts_with(&prefix) {
                continue;
            }
            let data: M = decode(&stored.bytes)?;
            if !filter(&data) {
                continue;
            }
            let rank = sort_key(&data);
            let better = match &selected {
                None => true,
                Some((best, best_key, _)) => (&rank, key) < (best, best_key),
            };
            if better {
                selected = Some((rank, key.clone(), data));
            }
        }

        let Some((_, key, mut data)) = selected else {
            return Ok(None);
        };

        update(&mut data);
        let version = write_back(&mut storage, key, &data)?;
        Ok(Some(Versioned { data, version }))
    }

    fn find_models<M: Model>(
        &self,
        predicate: &dyn Fn(&M) -> bool,
    ) -> Result<Vec<Versioned<M>>, ModelError> {
        let storage = self.read()?;

        let prefix = collection_prefix(M::COLLECTION);
        let mut results = Vec::new();

        for (key, stored) in storage.iter() {
            if key.starts_with(&prefix) {
                if let Ok(data) = serde_json::from_slice::<M>(&stored.bytes) {
                    if predicate(&data) {
                        results.push(Versioned {
                            data,
                            version: stored.version,
                        });
                    }
                }
            }
        }

        Ok(results)
    }

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx) -> Result<T, E>,
        E: From<ModelError>,
    {
        // The write lock is held for the whole unit, so staged writes cannot
        // interleave with any other writer.
        let mut storage = self.write()?;
        let mut tx = InMemoryTransaction {
            staged: storage.clone(),
        };

        let output = f(&mut tx)?;
        *storage = tx.staged;
        Ok(output)
    }
}

fn make_key(collection: &str, id: &str) -> String {
    format!("{}:{}", collection, id)
}

fn collection_prefix(collection: &str) -> String {
    format!("{}:", collection)
}

fn encode<M: Model>(model: &M) -> Result<Vec<u8>, ModelError> {
    serde_json::to_vec(model).map_err(|e| ModelError::Serde(e.to_string()))
}

fn decode<M: Model>(bytes: &[u8]) -> Result<M, ModelError> {
    serde_json::from_slice(bytes).map_err(|e| ModelError::Serde(e.to_string()))
}

fn get_in<M: Model>(docs: &Documents, id: &str) -> Result<Option<Versioned<M>>, ModelError> {
    match docs.get(&make_key(M::COLLECTION, id)) {
        Some(stored) => Ok(Some(Versioned {
            data: decode(&stored.bytes)?,
            version: stored.version,
        })),
        None => Ok(None),
    }
}

fn insert_in<M: Model>(docs: &mut Documents, model: &M) -> Result<Versioned<M>, ModelError> {
    let key = make_key(M::COLLECTION, model.id());
    let bytes = encode(model)?;

    if let Some(existing) = docs.get(&key) {
        return Err(ModelError::ConcurrencyConflict {
            collection: M::COLLECTION.to_string(),
            id: model.id().to_string(),
            expected: 0,
            actual: existing.version,
        });
    }

    docs.insert(key, StoredModel { bytes, version: 1 });

    Ok(Versioned {
        data: model.clone(),
        version: 1,
    })
}

fn update_where_in<M: Model>(
    docs: &mut Documents,
    id: &str,
    filter: &dyn Fn(&M) -> bool,
    update: &mut dyn FnMut(&mut M),
) -> Result<Option<Versioned<M>>, ModelError> {
    let key = make_key(M::COLLECTION, id);
    let mut data: M = match docs.get(&key) {
        Some(stored) => decode(&stored.bytes)?,
        None => return Ok(None),
    };

    if !filter(&data) {
        return Ok(None);
    }

    update(&mut data);
    let version = write_back(docs, key, &data)?;
    Ok(Some(Versioned { data, version }))
}

fn write_back<M: Model>(docs: &mut Documents, key: String, data: &M) -> Result<u64, ModelError> {
    let bytes = encode(data)?;
    let version = docs.get(&key).map(|s| s.version + 1).unwrap_or(1);
    docs.insert(key, StoredModel { bytes, version });
    Ok(version)
}
