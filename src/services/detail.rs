use serde::Serialize;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{MediaId, MediaItem, UserEntry},
    services::{
        list_store::ListStore,
        providers::MetadataProvider,
        recommendations::{RecommendationEngine, Recommendations},
    },
};

/// Everything shown for one media item
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DetailView {
    pub media: MediaItem,
    /// The user's entry, if the item is in any bucket
    pub entry: Option<UserEntry>,
    pub similar: Recommendations,
    /// Generation of the open request that produced this view
    pub generation: u64,
}

/// Result of opening the panel on a media id
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOpen {
    Applied(DetailView),
    NotFound,
    /// A newer open started while this one was in flight; its result was dropped
    Superseded { generation: u64, current: u64 },
}

/// The currently displayed detail view.
///
/// Each open takes a new generation number. Results are applied only if no
/// newer open started in the meantime, so a slow response for an old id can
/// never overwrite the view for a newer one.
pub struct DetailPanel {
    generation: AtomicU64,
    current: RwLock<Option<DetailView>>,
    provider: Arc<dyn MetadataProvider>,
    engine: RecommendationEngine,
    list_store: Arc<ListStore>,
}

impl DetailPanel {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        engine: RecommendationEngine,
        list_store: Arc<ListStore>,
    ) -> Self {
        Self {
            generation: AtomicU64::new(0),
            current: RwLock::new(None),
            provider,
            engine,
            list_store,
        }
    }

    pub async fn open(&self, media_id: MediaId) -> AppResult<DetailOpen> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let media = match self.provider.get_by_id(media_id).await {
            Ok(media) => media,
            Err(_) if !self.is_current(generation) => return Ok(self.superseded(generation)),
            Err(e) => return Err(e),
        };
        if !self.is_current(generation) {
            return Ok(self.superseded(generation));
        }
        let Some(media) = media else {
            return Ok(DetailOpen::NotFound);
        };

        let lists = self.list_store.snapshot().await;
        let similar = self.engine.similar(media_id, &lists).await;

        let view = DetailView {
            media,
            entry: lists.find(media_id).cloned(),
            similar,
            generation,
        };

        let mut current = self.current.write().await;
        if !self.is_current(generation) {
            return Ok(self.superseded(generation));
        }
        *current = Some(view.clone());

        tracing::debug!(media_id, generation, "Detail view applied");
        Ok(DetailOpen::Applied(view))
    }

    /// Abandons any in-flight open without starting a new one
    pub fn cancel(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn current(&self) -> Option<DetailView> {
        self.current.read().await.clone()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn superseded(&self, generation: u64) -> DetailOpen {
        let current = self.generation.load(Ordering::SeqCst);
        tracing::debug!(generation, current, "Discarding stale detail result");
        DetailOpen::Superseded {
            generation,
            current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemorySnapshotStore,
        error::AppError,
        models::{SearchFilters, Season, Status},
    };
    use tokio::sync::Notify;

    fn item(id: MediaId, genres: &[&str]) -> MediaItem {
        MediaItem::new(
            id,
            format!("Title {}", id),
            genres.iter().map(|g| g.to_string()).collect(),
        )
    }

    /// Provider whose lookup of `gated_id` blocks until released
    #[derive(Default)]
    struct GatedProvider {
        gated_id: MediaId,
        entered: Notify,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl MetadataProvider for GatedProvider {
        async fn search(
            &self,
            _query: &str,
            filters: &SearchFilters,
            _page: u32,
        ) -> AppResult<Vec<MediaItem>> {
            let genre = filters.genre.clone().unwrap_or_default();
            Ok(vec![item(900, &[genre.as_str()]), item(901, &[genre.as_str()])])
        }

        async fn get_by_id(&self, id: MediaId) -> AppResult<Option<MediaItem>> {
            if id == self.gated_id {
                self.entered.notify_one();
                self.release.notified().await;
            }
            match id {
                404 => Ok(None),
                500 => Err(AppError::ExternalApi("catalog down".to_string())),
                _ => Ok(Some(item(id, &["Action"]))),
            }
        }

        async fn get_popular(&self, _page: u32) -> AppResult<Vec<MediaItem>> {
            Ok(Vec::new())
        }

        async fn get_seasonal(&self, _season: Season, _year: i32) -> AppResult<Vec<MediaItem>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    fn panel(provider: Arc<GatedProvider>, list_store: Arc<ListStore>) -> Arc<DetailPanel> {
        let engine = RecommendationEngine::new(provider.clone());
        Arc::new(DetailPanel::new(provider, engine, list_store))
    }

    fn empty_store() -> Arc<ListStore> {
        Arc::new(ListStore::new(Arc::new(MemorySnapshotStore::new())))
    }

    #[tokio::test]
    async fn test_open_applies_view_with_entry() {
        let provider = Arc::new(GatedProvider::default());
        let list_store = empty_store();
        list_store.add(item(7, &["Action"]), Status::Watching).await;
        let panel = panel(provider, list_store);

        let DetailOpen::Applied(view) = panel.open(7).await.unwrap() else {
            panic!("expected applied view");
        };

        assert_eq!(view.media.id, 7);
        assert_eq!(view.entry.unwrap().status, Status::Watching);
        assert_eq!(
            view.similar.items.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![900, 901]
        );
        assert_eq!(panel.current().await.unwrap().generation, view.generation);
    }

    #[tokio::test]
    async fn test_unknown_media_is_not_found() {
        let panel = panel(Arc::new(GatedProvider::default()), empty_store());
        assert_eq!(panel.open(404).await.unwrap(), DetailOpen::NotFound);
        assert!(panel.current().await.is_none());
    }

    #[tokio::test]
    async fn test_provider_error_propagates_when_current() {
        let panel = panel(Arc::new(GatedProvider::default()), empty_store());
        assert!(matches!(panel.open(500).await, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_stale_open_does_not_overwrite_newer_view() {
        let provider = Arc::new(GatedProvider {
            gated_id: 1,
            ..GatedProvider::default()
        });
        let panel = panel(provider.clone(), empty_store());

        let slow = {
            let panel = panel.clone();
            tokio::spawn(async move { panel.open(1).await })
        };
        provider.entered.notified().await;

        let fast = panel.open(2).await.unwrap();
        assert!(matches!(fast, DetailOpen::Applied(ref view) if view.media.id == 2));

        provider.release.notify_one();
        let stale = slow.await.unwrap().unwrap();

        assert_eq!(
            stale,
            DetailOpen::Superseded {
                generation: 1,
                current: 2
            }
        );
        assert_eq!(panel.current().await.unwrap().media.id, 2);
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_open() {
        let provider = Arc::new(GatedProvider {
            gated_id: 3,
            ..GatedProvider::default()
        });
        let panel = panel(provider.clone(), empty_store());

        let pending = {
            let panel = panel.clone();
            tokio::spawn(async move { panel.open(3).await })
        };
        provider.entered.notified().await;

        panel.cancel();
        provider.release.notify_one();

        assert!(matches!(
            pending.await.unwrap().unwrap(),
            DetailOpen::Superseded { .. }
        ));
        assert!(panel.current().await.is_none());
    }
}
