use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watchlist_api::{
    api::{create_router, AppState},
    config::{Config, SnapshotBackend},
    db::{create_redis_client, Cache, MemorySnapshotStore, RedisSnapshotStore, SnapshotStore},
    services::{AniListProvider, ListStore, MetadataProvider},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("watchlist_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let (snapshots, cache, cache_handle) = match config.snapshot_backend {
        SnapshotBackend::Redis => {
            let client = create_redis_client(&config.redis_url)?;
            let (cache, handle) = Cache::connect(client.clone()).await?;
            let store: Arc<dyn SnapshotStore> = Arc::new(RedisSnapshotStore::new(
                client,
                config.snapshot_key.clone(),
            ));
            (store, Some(cache), Some(handle))
        }
        SnapshotBackend::Memory => {
            tracing::warn!("Using in-memory snapshot store, lists will not survive a restart");
            let store: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());
            (store, None, None)
        }
    };

    let provider: Arc<dyn MetadataProvider> = Arc::new(AniListProvider::new(
        config.anilist_api_url.clone(),
        cache,
        config.cache_ttl_secs,
    ));
    let list_store = Arc::new(ListStore::open(snapshots).await);

    let app = create_router(AppState::new(provider, list_store));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        addr = %addr,
        backend = ?config.snapshot_backend,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
