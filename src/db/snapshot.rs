use redis::AsyncCommands;
use redis::Client;
use tokio::sync::Mutex;

use crate::error::AppResult;

/// Durable home of the serialized list document.
///
/// Stores hold one opaque record; parsing and validation belong to the list store.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns the stored document, `None` if nothing was ever saved
    async fn load(&self) -> AppResult<Option<String>>;

    /// Replaces the stored document
    async fn save(&self, document: &str) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Snapshot kept under a single Redis key, without expiry
#[derive(Clone)]
pub struct RedisSnapshotStore {
    redis_client: Client,
    key: String,
}

impl RedisSnapshotStore {
    pub fn new(redis_client: Client, key: impl Into<String>) -> Self {
        Self {
            redis_client,
            key: key.into(),
        }
    }
}

#[async_trait::async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn load(&self) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let document: Option<String> = conn.get(&self.key).await?;
        Ok(document)
    }

    async fn save(&self, document: &str) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(&self.key, document).await?;
        tracing::debug!(key = %self.key, bytes = document.len(), "Snapshot written to Redis");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Snapshot held in process memory
#[derive(Default)]
pub struct MemorySnapshotStore {
    record: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a document, as if a previous process had saved it
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(document.into())),
        }
    }

    /// Current stored document
    pub async fn document(&self) -> Option<String> {
        self.record.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> AppResult<Option<String>> {
        Ok(self.record.lock().await.clone())
    }

    async fn save(&self, document: &str) -> AppResult<()> {
        *self.record.lock().await = Some(document.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_starts_empty() {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_save_replaces_document() {
        let store = MemorySnapshotStore::with_document("old");
        store.save("new").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("new"));
        assert_eq!(store.document().await.as_deref(), Some("new"));
    }
}
