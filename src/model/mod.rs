//! Models - Versioned documents backing works, outbox events and mint intents.
//!
//! Models provide a small document-store abstraction: every document lives
//! in a collection, carries a version that increases on each write, and can be
//! changed through conditional single-document writes or inside an atomic
//! multi-document transaction.
//!
//! ## Example
//!
//! ```ignore
//! use storymint::{InMemoryModelStore, Model, ModelsExt};
//!
//! #[derive(Serialize, Deserialize, Clone)]
//! struct Note {
//!     pub id: String,
//!     pub body: String,
//! }
//!
//! impl Model for Note {
//!     const COLLECTION: &'static str = "notes";
//!     fn id(&self) -> &str { &self.id }
//! }
//!
//! let store = InMemoryModelStore::new();
//! store.models::<Note>().insert(&note)?;
//! let loaded = store.models::<Note>().get("note-1")?;
//! ```

mod collection;
mod in_memory;
mod store;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Trait for types that can be stored as models.
pub trait Model: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// The collection name for this model type (e.g., "works", "outbox_events").
    /// Maps to a table in SQL, a collection in MongoDB, a key prefix in KV stores, etc.
    const COLLECTION: &'static str;

    /// Returns the unique identifier for this model instance.
    fn id(&self) -> &str;
}

/// A versioned wrapper around model data for optimistic concurrency control.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
}

/// Error type for model store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Optimistic concurrency conflict, or an insert on an existing key.
    #[error("concurrency conflict on {collection}:{id} (expected version {expected}, actual {actual})")]
    ConcurrencyConflict {
        collection: String,
        id: String,
        expected: u64,
        actual: u64,
    },
    /// Serialization/deserialization error.
    #[error("model serialization error: {0}")]
    Serde(String),
    /// Storage-level error (unreachable backend, poisoned lock).
    #[error("model storage error: {0}")]
    Storage(String),
    /// Model not found.
    #[error("model not found: {collection}:{id}")]
    NotFound { collection: String, id: String },
}

pub use in_memory::{InMemoryModelStore, InMemoryTransaction};
pub use collection::{Collection, ModelsExt};
pub use store::{ModelStore, ModelTx};
