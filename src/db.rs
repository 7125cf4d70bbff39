use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::store::{DocumentStore, MemoryStore, MySqlStore};

/// Opens the configured document store. Without a database URL the service
/// runs on a process-local store whose contents vanish on restart.
pub async fn init_store(database_url: Option<&str>) -> Result<Arc<dyn DocumentStore>> {
    match database_url {
        Some(url) => {
            let store = MySqlStore::connect(url)
                .await
                .context("Failed to connect to database")?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
