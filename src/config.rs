use serde::Deserialize;

/// Where the list snapshot is persisted
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotBackend {
    /// Single redis key, survives restarts
    Redis,
    /// Process memory only
    Memory,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// AniList GraphQL endpoint
    #[serde(default = "default_anilist_api_url")]
    pub anilist_api_url: String,

    /// Snapshot persistence backend
    #[serde(default = "default_snapshot_backend")]
    pub snapshot_backend: SnapshotBackend,

    /// Key holding the persisted lists
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,

    /// TTL for cached provider responses, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_anilist_api_url() -> String {
    "https://graphql.anilist.co".to_string()
}

fn default_snapshot_backend() -> SnapshotBackend {
    SnapshotBackend::Redis
}

fn default_snapshot_key() -> String {
    "animeLists".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_environment() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.snapshot_backend, SnapshotBackend::Redis);
        assert_eq!(config.snapshot_key, "animeLists");
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_memory_backend_from_environment() {
        let config: Config = envy::from_iter(vec![
            ("SNAPSHOT_BACKEND".to_string(), "memory".to_string()),
            ("PORT".to_string(), "8080".to_string()),
        ])
        .unwrap();
        assert_eq!(config.snapshot_backend, SnapshotBackend::Memory);
        assert_eq!(config.port, 8080);
    }
}
