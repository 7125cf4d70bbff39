use std::collections::{BTreeSet, HashMap};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{
    Document, DocumentStore, FieldPath, FieldUpdate, StoreError, StoreResult, Subscription,
    SubscriptionHub, WriteBatch, path,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection VARCHAR(64) NOT NULL,
    id VARCHAR(64) NOT NULL,
    body JSON NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
    PRIMARY KEY (collection, id)
)
"#;

/// Document store over a single MySQL table of JSON bodies.
///
/// MySQL cannot create missing parents in a JSON path update, so field
/// updates are read-modify-write inside a transaction that holds the row
/// lock (`SELECT ... FOR UPDATE`). Concurrent edits of one document are
/// therefore serialized and never lose each other's fields.
///
/// Subscriptions only observe writes made through this process.
pub struct MySqlStore {
    pool: MySqlPool,
    hub: SubscriptionHub,
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(e.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl MySqlStore {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = MySqlPool::connect(database_url).await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        info!("MySQL document store ready");
        Ok(store)
    }

    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            hub: SubscriptionHub::default(),
        }
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn load(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT id, CAST(body AS CHAR)
            FROM documents
            WHERE collection = ?
            ORDER BY id
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, body)| Ok(Document { id, body: parse_body(&body)? }))
            .collect()
    }

    /// Pushes the post-commit result set to live subscriptions. The sequence
    /// is taken before the reload, so a slow reload racing a later commit is
    /// recognised as stale by the subscriptions.
    async fn notify(&self, collection: &str) {
        if !self.hub.has_subscribers(collection) {
            return;
        }

        let sequence = self.hub.next_sequence();
        match self.load(collection).await {
            Ok(documents) => self.hub.publish(collection, sequence, documents),
            Err(e) => error!(error = %e, collection, "Failed to refresh subscriptions"),
        }
    }

    async fn lock_body(tx: &mut Transaction<'_, MySql>, collection: &str, id: &str) -> StoreResult<Value> {
        let body = sqlx::query_scalar::<_, String>(
            r#"
            SELECT CAST(body AS CHAR)
            FROM documents
            WHERE collection = ? AND id = ?
            FOR UPDATE
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::not_found(collection, id))?;

        parse_body(&body)
    }

    async fn store_body(tx: &mut Transaction<'_, MySql>, collection: &str, id: &str, body: &Value) -> StoreResult<()> {
        sqlx::query("UPDATE documents SET body = ? WHERE collection = ? AND id = ?")
            .bind(body.to_string())
            .bind(collection)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn mutate(&self, collection: &str, id: &str, change: impl FnOnce(&mut Value) + Send) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let mut body = Self::lock_body(&mut tx, collection, id).await?;
        change(&mut body);
        Self::store_body(&mut tx, collection, id, &body).await?;

        tx.commit().await?;
        self.notify(collection).await;
        Ok(())
    }

    async fn apply_batch(&self, batch: &WriteBatch) -> StoreResult<BTreeSet<String>> {
        let mut tx = self.pool.begin().await?;
        let mut staged: HashMap<(String, String), Value> = HashMap::new();

        for op in batch.ops() {
            let (collection, id) = op.target();
            let key = (collection.to_string(), id.to_string());

            if !staged.contains_key(&key) {
                let body = Self::lock_body(&mut tx, collection, id).await?;
                staged.insert(key.clone(), body);
            }
            if let Some(body) = staged.get_mut(&key) {
                op.apply(body);
            }
        }

        for ((collection, id), body) in &staged {
            Self::store_body(&mut tx, collection, id, body).await?;
        }

        tx.commit().await?;
        Ok(staged.into_keys().map(|(collection, _)| collection).collect())
    }
}

fn parse_body(raw: &str) -> StoreResult<Value> {
    serde_json::from_str(raw).map_err(|e| StoreError::Backend(format!("stored document is not JSON: {e}")))
}

impl DocumentStore for MySqlStore {
    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Document>>> {
        async move {
            let body = sqlx::query_scalar::<_, String>(
                "SELECT CAST(body AS CHAR) FROM documents WHERE collection = ? AND id = ?",
            )
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            body.map(|raw| {
                Ok(Document {
                    id: id.to_string(),
                    body: parse_body(&raw)?,
                })
            })
            .transpose()
        }
        .boxed()
    }

    fn query<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
        self.load(collection).boxed()
    }

    fn insert<'a>(&'a self, collection: &'a str, body: Value) -> BoxFuture<'a, StoreResult<Document>> {
        async move {
            if !body.is_object() {
                return Err(StoreError::Backend("document body must be a JSON object".to_string()));
            }

            let id = Uuid::new_v4().to_string();
            sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
                .bind(collection)
                .bind(&id)
                .bind(body.to_string())
                .execute(&self.pool)
                .await?;

            self.notify(collection).await;
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
            let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::not_found(collection, id));
            }

            self.notify(collection).await;
            Ok(())
        }
        .boxed()
    }

    fn commit(&self, batch: WriteBatch) -> BoxFuture<'_, StoreResult<()>> {
        async move {
            // dropping the transaction on error rolls it back
            let touched = self.apply_batch(&batch).await.map_err(|e| match e {
                StoreError::Unavailable(_) => e,
                other => StoreError::BatchAborted(other.to_string()),
            })?;

            for collection in &touched {
                self.notify(collection).await;
            }

            debug!(ops = batch.len(), "batch committed");
            Ok(())
        }
        .boxed()
    }

    fn subscribe<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, StoreResult<Subscription>> {
        async move {
            let rx = self.hub.receiver(collection);
            let seen = self.hub.sequence();
            let initial = self.load(collection).await?;
            Ok(Subscription::new(collection, initial, seen, rx))
        }
        .boxed()
    }
}

