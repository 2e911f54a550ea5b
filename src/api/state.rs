use std::sync::Arc;

use crate::services::{DetailPanel, ListStore, MetadataProvider, RecommendationEngine};

/// Shared application state
///
/// One list store per process, handed to every handler through axum state.
#[derive(Clone)]
pub struct AppState {
    pub list_store: Arc<ListStore>,
    pub provider: Arc<dyn MetadataProvider>,
    pub engine: RecommendationEngine,
    pub detail: Arc<DetailPanel>,
}

impl AppState {
    /// Wires the engine and detail panel around a provider and an opened list store
    pub fn new(provider: Arc<dyn MetadataProvider>, list_store: Arc<ListStore>) -> Self {
        let engine = RecommendationEngine::new(provider.clone());
        let detail = Arc::new(DetailPanel::new(
            provider.clone(),
            engine.clone(),
            list_store.clone(),
        ));

        Self {
            list_store,
            provider,
            engine,
            detail,
        }
    }
}
