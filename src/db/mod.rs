pub mod redis;
pub mod snapshot;

pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use redis::CacheWriterHandle;
pub use snapshot::{MemorySnapshotStore, RedisSnapshotStore, SnapshotStore};
