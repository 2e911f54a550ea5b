use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Lists
        .route("/lists", get(handlers::get_lists))
        .route("/lists/:status", get(handlers::get_bucket).post(handlers::add_entry))
        .route(
            "/lists/:status/:media_id",
            patch(handlers::update_entry).delete(handlers::remove_entry),
        )
        .route("/stats", get(handlers::get_counts))
        .route("/entries/:media_id", get(handlers::lookup_entry))
        // Catalog
        .route("/search", get(handlers::search_media))
        .route("/media/:media_id", get(handlers::get_media))
        .route("/media/:media_id/similar", get(handlers::similar_media))
        // Detail panel
        .route("/detail", get(handlers::current_detail))
        .route("/detail/:media_id", post(handlers::open_detail))
        // Recommendations
        .route(
            "/recommendations/personal",
            get(handlers::personal_recommendations),
        )
        .route(
            "/recommendations/popular",
            get(handlers::popular_recommendations),
        )
        .route(
            "/recommendations/trending",
            get(handlers::trending_recommendations),
        )
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
