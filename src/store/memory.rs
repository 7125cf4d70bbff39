use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    DocumentStore, Document, FieldPath, FieldUpdate, StoreError, StoreResult, Subscription, SubscriptionHub,
    WriteBatch, path,
};

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// Process-local document store. Used when no database is configured and by
/// the test suites, which can inject outages and mid-batch failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    hub: SubscriptionHub,
    unavailable: AtomicBool,
    fail_batch_at: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document with a caller-chosen id, replacing any existing one.
    pub async fn put(&self, collection: &str, id: &str, body: Value) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), body);
        self.publish(collection, &collections);
    }

    /// While set, every operation fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes the next committed batch fail just before applying the
    /// operation at `index`.
    pub fn fail_next_batch_at(&self, index: usize) {
        *self.fail_batch_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(index);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }

    fn take_batch_fault(&self) -> Option<usize> {
        self.fail_batch_at.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn publish(&self, collection: &str, collections: &Collections) {
        if self.hub.has_subscribers(collection) {
            let sequence = self.hub.next_sequence();
            self.hub.publish(collection, sequence, documents_of(collections, collection));
        }
    }

    async fn mutate(&self, collection: &str, id: &str, change: impl FnOnce(&mut Value) + Send) -> StoreResult<()> {
        self.check_available()?;

        let mut collections = self.collections.write().await;
        let body = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        change(body);
        self.publish(collection, &collections);
        Ok(())
    }
}

fn documents_of(collections: &Collections, collection: &str) -> Vec<Document> {
    collections
        .get(collection)
        .map(|docs| {
            docs.iter()
                .map(|(id, body)| Document {
                    id: id.clone(),
                    body: body.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

impl DocumentStore for MemoryStore {
    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Document>>> {
        async move {
            self.check_available()?;
            let collections = self.collections.read().await;
            Ok(collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .map(|body| Document {
                    id: id.to_string(),
                    body: body.clone(),
                }))
        }
        .boxed()
    }

    fn query<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
        async move {
            self.check_available()?;
            let collections = self.collections.read().await;
            Ok(documents_of(&collections, collection))
        }
        .boxed()
    }

    fn insert<'a>(&'a self, collection: &'a str, body: Value) -> BoxFuture<'a, StoreResult<Document>> {
        async move {
            self.check_available()?;
            if !body.is_object() {
                return Err(StoreError::Backend("document body must be a JSON object".to_string()));
            }

            let id = Uuid::new_v4().to_string();
            let mut collections = self.collections.write().await;
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), body.clone());
            self.publish(collection, &collections);

            Ok(Document { id, body })
        }
        .boxed()
    }

    fn update_fields<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        updates: Vec<FieldUpdate>,
    ) -> BoxFuture<'a, StoreResult<()>> {
        self.mutate(collection, id, move |body| {
            for update in updates {
                path::set_path(body, &update.path, update.value);
            }
        })
        .boxed()
    }

    fn delete_field<'a>(&'a self, collection: &'a str, id: &'a str, path: FieldPath) -> BoxFuture<'a, StoreResult<()>> {
        self.mutate(collection, id, move |body| {
            path::remove_path(body, &path);
        })
        .boxed()
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        async move {
            self.check_available()?;
            let mut collections = self.collections.write().await;
            collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            self.publish(collection, &collections);
            Ok(())
        }
        .boxed()
    }

    fn commit(&self, batch: WriteBatch) -> BoxFuture<'_, StoreResult<()>> {
        async move {
            self.check_available()?;

            let mut collections = self.collections.write().await;
            let fail_at = self.take_batch_fault();

            // staged copy; the live map is only swapped once every op applied
            let mut staged = collections.clone();
            let mut touched = BTreeSet::new();

            for (index, op) in batch.ops().iter().enumerate() {
                if fail_at == Some(index) {
                    return Err(StoreError::BatchAborted(format!(
                        "injected failure at operation {index}"
                    )));
                }

                let (collection, id) = op.target();
                let body = staged
                    .get_mut(collection)
                    .and_then(|docs| docs.get_mut(id))
                    .ok_or_else(|| StoreError::BatchAborted(StoreError::not_found(collection, id).to_string()))?;

                op.apply(body);
                touched.insert(collection.to_string());
            }

            *collections = staged;
            for collection in &touched {
                self.publish(collection, &collections);
            }

            debug!(ops = batch.len(), "batch committed");
            Ok(())
        }
        .boxed()
    }

    fn subscribe<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, StoreResult<Subscription>> {
        async move {
            self.check_available()?;
            let rx = self.hub.receiver(collection);
            let collections = self.collections.read().await;
            let seen = self.hub.sequence();
            Ok(Subscription::new(collection, documents_of(&collections, collection), seen, rx))
        }
        .boxed()
    }
}
