use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{
        EntryUpdate, ListCounts, Lists, MediaId, MediaItem, SearchFilters, Season, SortBy,
        SortOrder, Status, UserEntry,
    },
    services::{
        recommendations::recommendation_reasons, DetailOpen, DetailView, MutationOutcome,
        RecommendationOutcome, Recommendations,
    },
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct AddEntryRequest {
    pub media_id: MediaId,
}

/// Catalog search query string
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub genre: Option<String>,
    pub season: Option<Season>,
    pub year: Option<i32>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<u32>,
}

impl SearchParams {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            genre: self.genre.clone(),
            season: self.season,
            year: self.year,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        }
    }
}

/// A personal recommendation with the favourite genres it matches
#[derive(Debug, Serialize)]
pub struct RecommendedItem {
    #[serde(flatten)]
    pub media: MediaItem,
    pub reasons: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PersonalRecommendationsResponse {
    pub items: Vec<RecommendedItem>,
    pub outcome: RecommendationOutcome,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// All five buckets
pub async fn get_lists(State(state): State<AppState>) -> Json<Lists> {
    Json(state.list_store.snapshot().await)
}

/// Entry count per bucket
pub async fn get_counts(State(state): State<AppState>) -> Json<ListCounts> {
    Json(state.list_store.counts().await)
}

/// Entries of one bucket, in insertion order
pub async fn get_bucket(
    State(state): State<AppState>,
    Path(status): Path<Status>,
) -> Json<Vec<UserEntry>> {
    let lists = state.list_store.snapshot().await;
    Json(lists.bucket(status).to_vec())
}

/// Adds a catalog item to a bucket
pub async fn add_entry(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(status): Path<Status>,
    Json(request): Json<AddEntryRequest>,
) -> AppResult<(StatusCode, Json<MutationOutcome>)> {
    let media = state
        .provider
        .get_by_id(request.media_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Media {} not found", request.media_id)))?;

    tracing::info!(
        request_id = %request_id,
        media_id = media.id,
        status = %status,
        "Adding entry"
    );

    let outcome = state.list_store.add(media, status).await;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Merges progress, rating or notes into an entry
pub async fn update_entry(
    State(state): State<AppState>,
    Path((status, media_id)): Path<(Status, MediaId)>,
    Json(update): Json<EntryUpdate>,
) -> AppResult<Json<MutationOutcome>> {
    let outcome = state.list_store.update(media_id, status, &update).await?;
    Ok(Json(outcome))
}

/// Removes an item from one bucket
pub async fn remove_entry(
    State(state): State<AppState>,
    Path((status, media_id)): Path<(Status, MediaId)>,
) -> Json<MutationOutcome> {
    Json(state.list_store.remove(media_id, status).await)
}

/// The user's entry for an item, from whichever bucket is found first
pub async fn lookup_entry(
    State(state): State<AppState>,
    Path(media_id): Path<MediaId>,
) -> AppResult<Json<UserEntry>> {
    state
        .list_store
        .lookup(media_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Media {} is not in any list", media_id)))
}

/// Catalog search
pub async fn search_media(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let query = params.q.as_deref().unwrap_or_default();
    let page = params.page.unwrap_or(1).max(1);
    let results = state
        .provider
        .search(query, &params.filters(), page)
        .await?;
    Ok(Json(results))
}

/// Single catalog item
pub async fn get_media(
    State(state): State<AppState>,
    Path(media_id): Path<MediaId>,
) -> AppResult<Json<MediaItem>> {
    state
        .provider
        .get_by_id(media_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Media {} not found", media_id)))
}

/// Items similar to a catalog item, excluding anything already listed
pub async fn similar_media(
    State(state): State<AppState>,
    Path(media_id): Path<MediaId>,
) -> Json<Recommendations> {
    let lists = state.list_store.snapshot().await;
    Json(state.engine.similar(media_id, &lists).await)
}

/// Opens the detail panel on an item; a newer open supersedes this one
pub async fn open_detail(
    State(state): State<AppState>,
    Path(media_id): Path<MediaId>,
) -> AppResult<Response> {
    let response = match state.detail.open(media_id).await? {
        DetailOpen::Applied(view) => Json(view).into_response(),
        DetailOpen::NotFound => {
            return Err(AppError::NotFound(format!("Media {} not found", media_id)))
        }
        DetailOpen::Superseded {
            generation,
            current,
        } => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Superseded by a newer detail request",
                "generation": generation,
                "current": current,
            })),
        )
            .into_response(),
    };
    Ok(response)
}

/// The detail view currently displayed
pub async fn current_detail(State(state): State<AppState>) -> AppResult<Json<DetailView>> {
    state
        .detail
        .current()
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No detail view open".to_string()))
}

/// Recommendations from the user's favourite genres
pub async fn personal_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Json<PersonalRecommendationsResponse> {
    let lists = state.list_store.snapshot().await;
    let recommendations = state.engine.personal(&lists).await;

    tracing::info!(
        request_id = %request_id,
        count = recommendations.items.len(),
        outcome = ?recommendations.outcome,
        "Personal recommendations computed"
    );

    let items = recommendations
        .items
        .into_iter()
        .map(|media| RecommendedItem {
            reasons: recommendation_reasons(&lists, &media),
            media,
        })
        .collect();

    Json(PersonalRecommendationsResponse {
        items,
        outcome: recommendations.outcome,
    })
}

pub async fn popular_recommendations(State(state): State<AppState>) -> Json<Recommendations> {
    Json(state.engine.popular().await)
}

pub async fn trending_recommendations(State(state): State<AppState>) -> Json<Recommendations> {
    Json(state.engine.trending().await)
}
