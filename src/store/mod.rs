//! Document store interface consumed by the ledger and the HTTP layer.
//!
//! The store holds JSON documents grouped in collections. Writes are either
//! path-scoped field updates on one document or an atomic [`WriteBatch`]
//! spanning several documents. Readers that need to follow changes take a
//! [`Subscription`] instead of polling.

pub mod hub;
pub mod memory;
pub mod mysql;
pub mod path;

use derive_more::Display;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

pub use hub::{Published, Snapshot, Subscription, SubscriptionHub};
pub use memory::MemoryStore;
pub use mysql::MySqlStore;
pub use path::FieldPath;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub path: FieldPath,
    pub value: Value,
}

impl FieldUpdate {
    pub fn new(path: FieldPath, value: Value) -> Self {
        Self { path, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Update {
        collection: String,
        id: String,
        updates: Vec<FieldUpdate>,
    },
    DeleteField {
        collection: String,
        id: String,
        path: FieldPath,
    },
}

impl BatchOp {
    pub fn target(&self) -> (&str, &str) {
        match self {
            BatchOp::Update { collection, id, .. } | BatchOp::DeleteField { collection, id, .. } => {
                (collection, id)
            }
        }
    }

    /// Applies the operation to the body of its target document.
    pub fn apply(&self, body: &mut Value) {
        match self {
            BatchOp::Update { updates, .. } => {
                for update in updates {
                    path::set_path(body, &update.path, update.value.clone());
                }
            }
            BatchOp::DeleteField { path, .. } => {
                path::remove_path(body, path);
            }
        }
    }
}

/// Ordered set of writes committed all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> &mut Self {
        self.ops.push(BatchOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            updates,
        });
        self
    }

    pub fn delete_field(&mut self, collection: &str, id: &str, path: FieldPath) -> &mut Self {
        self.ops.push(BatchOp::DeleteField {
            collection: collection.to_string(),
            id: id.to_string(),
            path,
        });
        self
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum StoreError {
    #[display(fmt = "document {}/{} not found", collection, id)]
    NotFound { collection: String, id: String },
    /// Transient: the backend could not be reached. Not retried here.
    #[display(fmt = "document store unavailable: {}", _0)]
    Unavailable(String),
    /// The batch was rolled back; no document in it changed.
    #[display(fmt = "batch aborted: {}", _0)]
    BatchAborted(String),
    #[display(fmt = "document store error: {}", _0)]
    Backend(String),
}

impl std::error::Error for StoreError {}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Generic document store. Implementations must be shareable across
/// handlers, so every operation returns a boxed `Send` future.
pub trait DocumentStore: Send + Sync {
    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Document>>>;

    /// All documents of a collection, ordered by id.
    fn query<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, StoreResult<Vec<Document>>>;

    /// Stores a new document under an id assigned by the store.
    fn insert<'a>(&'a self, collection: &'a str, body: Value) -> BoxFuture<'a, StoreResult<Document>>;

    /// Path-scoped partial update; fields outside the given paths are kept.
    fn update_fields<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        updates: Vec<FieldUpdate>,
    ) -> BoxFuture<'a, StoreResult<()>>;

    fn delete_field<'a>(&'a self, collection: &'a str, id: &'a str, path: FieldPath) -> BoxFuture<'a, StoreResult<()>>;

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, StoreResult<()>>;

    fn commit(&self, batch: WriteBatch) -> BoxFuture<'_, StoreResult<()>>;

    fn subscribe<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, StoreResult<Subscription>>;
}
