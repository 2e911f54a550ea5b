use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::fmt::Display;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::error::{AppError, AppResult};
use crate::models::{MediaId, Season};

/// Namespace shared by every cached provider response
const KEY_PREFIX: &str = "anilist";

/// Pending writes beyond this are dropped rather than queued
const WRITE_QUEUE_CAPACITY: usize = 1024;

/// Provider response addressed by the request that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Canonical form of a catalog search (query, filters, page)
    Search(String),
    Media(MediaId),
    Popular(u32),
    Seasonal(Season, i32),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Search(canonical) => {
                write!(f, "{}:search:{}", KEY_PREFIX, canonical.to_lowercase())
            }
            CacheKey::Media(id) => write!(f, "{}:media:{}", KEY_PREFIX, id),
            CacheKey::Popular(page) => write!(f, "{}:popular:{}", KEY_PREFIX, page),
            CacheKey::Seasonal(season, year) => {
                write!(f, "{}:seasonal:{}:{}", KEY_PREFIX, season, year)
            }
        }
    }
}

/// Opens a Redis client for the given URL.
///
/// Shared by the response cache and the redis snapshot backend.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    Ok(Client::open(redis_url)?)
}

struct PendingWrite {
    key: String,
    json: String,
    ttl: u64,
}

/// Read-through cache for provider responses.
///
/// Reads go straight to Redis; writes are queued and applied by a single
/// writer task so a slow Redis never delays a response.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    writes: mpsc::Sender<PendingWrite>,
}

/// Stops the writer task once the queued writes are applied
pub struct CacheWriterHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Connects to Redis and spawns the writer task
    pub async fn connect(redis_client: Client) -> AppResult<(Self, CacheWriterHandle)> {
        let conn = ConnectionManager::new(redis_client).await?;
        let (writes, queue) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let (stop, stopped) = oneshot::channel();

        let task = tokio::spawn(run_writer(conn.clone(), queue, stopped));

        Ok((Self { conn, writes }, CacheWriterHandle { stop, task }))
    }

    /// Cached value for the key, `None` on a miss
    pub async fn read<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let stored: Option<String> = conn.get(key.to_string()).await?;

        stored
            .map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| AppError::Internal(format!("Stale cache entry {}: {}", key, e)))
            })
            .transpose()
    }

    /// Queues the value for writing; never waits on Redis
    pub fn write_behind<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Could not serialize cache value");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            json,
            ttl,
        };
        if let Err(e) = self.writes.try_send(write) {
            tracing::warn!(error = %e, key = %key, "Cache write dropped");
        }
    }
}

async fn run_writer(
    conn: ConnectionManager,
    mut queue: mpsc::Receiver<PendingWrite>,
    mut stopped: oneshot::Receiver<()>,
) {
    tracing::debug!("Cache writer started");

    loop {
        tokio::select! {
            next = queue.recv() => match next {
                Some(write) => apply(&conn, write).await,
                None => break,
            },
            _ = &mut stopped => {
                queue.close();
                while let Some(write) = queue.recv().await {
                    apply(&conn, write).await;
                }
                break;
            }
        }
    }

    tracing::info!("Cache writer stopped");
}

async fn apply(conn: &ConnectionManager, write: PendingWrite) {
    let mut conn = conn.clone();
    let result: redis::RedisResult<()> = conn.set_ex(&write.key, write.json, write.ttl).await;
    if let Err(e) = result {
        tracing::error!(error = %e, key = %write.key, "Cache write failed");
    }
}
