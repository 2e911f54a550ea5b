use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Lists, MediaId, MediaItem, SearchFilters, Season},
    services::{genre_weights, providers::MetadataProvider},
};

/// Genres queried for personal recommendations
const TOP_GENRES: usize = 3;
/// Items kept from each genre query
const PER_GENRE_LIMIT: usize = 5;
/// Personal results below this size are backfilled from the popular list
const BACKFILL_TARGET: usize = 10;
const PERSONAL_LIMIT: usize = 20;
const TRENDING_LIMIT: usize = 20;
/// Genres of the target item used by the similarity query
const SIMILAR_GENRES: usize = 2;
const SIMILAR_PER_GENRE: usize = 3;
const SIMILAR_LIMIT: usize = 6;

/// How a recommendation list was produced
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    /// Computed as requested
    Fresh,
    /// Nothing watched or watching yet, popular list returned as is
    NoHistory,
    /// The provider failed; items are the mode's fallback
    ProviderFallback { error: String },
}

/// Ranked items with the way they were obtained
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendations {
    pub items: Vec<MediaItem>,
    pub outcome: RecommendationOutcome,
}

impl Recommendations {
    fn fresh(items: Vec<MediaItem>) -> Self {
        Self {
            items,
            outcome: RecommendationOutcome::Fresh,
        }
    }
}

/// Turns list snapshots into ranked catalog suggestions.
///
/// All modes are reads: the lists are only consulted. Provider calls within one
/// pass are issued one after another.
#[derive(Clone)]
pub struct RecommendationEngine {
    provider: Arc<dyn MetadataProvider>,
}

impl RecommendationEngine {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self { provider }
    }

    /// Recommendations weighted by the genres of watched and watching entries.
    ///
    /// Any provider failure abandons the pass and falls back to the popular list.
    pub async fn personal(&self, lists: &Lists) -> Recommendations {
        if lists.watched.is_empty() && lists.watching.is_empty() {
            return match self.provider.get_popular(1).await {
                Ok(items) => Recommendations {
                    items,
                    outcome: RecommendationOutcome::NoHistory,
                },
                Err(e) => {
                    tracing::warn!(error = %e, mode = "personal", "Popular list unavailable");
                    Recommendations {
                        items: Vec::new(),
                        outcome: RecommendationOutcome::ProviderFallback {
                            error: e.to_string(),
                        },
                    }
                }
            };
        }

        match self.try_personal(lists).await {
            Ok(items) => Recommendations::fresh(items),
            Err(e) => {
                tracing::warn!(error = %e, mode = "personal", "Falling back to popular list");
                self.popular_fallback(e.to_string()).await
            }
        }
    }

    async fn try_personal(&self, lists: &Lists) -> AppResult<Vec<MediaItem>> {
        let history = lists.watched.iter().chain(lists.watching.iter());
        let genres = genre_weights::rank_genres(history);

        let mut recommendations: Vec<MediaItem> = Vec::new();
        for genre in genres.iter().take(TOP_GENRES) {
            let found = self
                .provider
                .search("", &SearchFilters::genre(genre.as_str()), 1)
                .await?;

            let before = recommendations.len();
            // No dedup against earlier genres of this pass
            recommendations.extend(
                found
                    .into_iter()
                    .filter(|item| !lists.contains_media(item.id))
                    .take(PER_GENRE_LIMIT),
            );

            tracing::debug!(
                genre = %genre,
                kept = recommendations.len() - before,
                "Genre candidates collected"
            );
        }

        if recommendations.len() < BACKFILL_TARGET {
            let missing = BACKFILL_TARGET - recommendations.len();
            let popular = self.provider.get_popular(1).await?;
            let backfill: Vec<MediaItem> = popular
                .into_iter()
                .filter(|item| {
                    !lists.contains_media(item.id)
                        && !recommendations.iter().any(|rec| rec.id == item.id)
                })
                .take(missing)
                .collect();

            tracing::debug!(backfilled = backfill.len(), "Backfilled from popular list");
            recommendations.extend(backfill);
        }

        recommendations.truncate(PERSONAL_LIMIT);
        Ok(recommendations)
    }

    /// Popular list passthrough; empty when the provider fails
    pub async fn popular(&self) -> Recommendations {
        match self.provider.get_popular(1).await {
            Ok(items) => Recommendations::fresh(items),
            Err(e) => {
                tracing::warn!(error = %e, mode = "popular", "Popular list unavailable");
                Recommendations {
                    items: Vec::new(),
                    outcome: RecommendationOutcome::ProviderFallback {
                        error: e.to_string(),
                    },
                }
            }
        }
    }

    /// Current season's titles followed by the popular list
    pub async fn trending(&self) -> Recommendations {
        self.trending_at(Utc::now()).await
    }

    /// Trending list for the season containing `now`.
    ///
    /// Seasonal and popular results are concatenated without deduplication.
    pub async fn trending_at(&self, now: DateTime<Utc>) -> Recommendations {
        let (season, year) = Season::at(now);

        match self.try_trending(season, year).await {
            Ok(items) => Recommendations::fresh(items),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    mode = "trending",
                    season = %season,
                    year,
                    "Falling back to popular list"
                );
                self.popular_fallback(e.to_string()).await
            }
        }
    }

    async fn try_trending(&self, season: Season, year: i32) -> AppResult<Vec<MediaItem>> {
        let mut trending = self.provider.get_seasonal(season, year).await?;
        trending.extend(self.provider.get_popular(1).await?);
        trending.truncate(TRENDING_LIMIT);
        Ok(trending)
    }

    /// Items sharing the target's leading genres, excluding the target and
    /// anything already in the lists. Empty when the target is unknown or the
    /// provider fails.
    pub async fn similar(&self, target_id: MediaId, lists: &Lists) -> Recommendations {
        match self.try_similar(target_id, lists).await {
            Ok(items) => Recommendations::fresh(items),
            Err(e) => {
                tracing::warn!(error = %e, target_id, "Similar items unavailable");
                Recommendations {
                    items: Vec::new(),
                    outcome: RecommendationOutcome::ProviderFallback {
                        error: e.to_string(),
                    },
                }
            }
        }
    }

    async fn try_similar(&self, target_id: MediaId, lists: &Lists) -> AppResult<Vec<MediaItem>> {
        let Some(target) = self.provider.get_by_id(target_id).await? else {
            tracing::debug!(target_id, "Similarity target not found");
            return Ok(Vec::new());
        };

        let mut similar = Vec::new();
        for genre in target.genres.iter().take(SIMILAR_GENRES) {
            let found = self
                .provider
                .search("", &SearchFilters::genre(genre.as_str()), 1)
                .await?;

            similar.extend(
                found
                    .into_iter()
                    .filter(|item| item.id != target_id && !lists.contains_media(item.id))
                    .take(SIMILAR_PER_GENRE),
            );
        }

        similar.truncate(SIMILAR_LIMIT);
        Ok(similar)
    }

    async fn popular_fallback(&self, error: String) -> Recommendations {
        let items = match self.provider.get_popular(1).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(error = %e, "Popular fallback failed as well");
                Vec::new()
            }
        };

        Recommendations {
            items,
            outcome: RecommendationOutcome::ProviderFallback { error },
        }
    }
}

/// Genres an item shares with the user's ranked genres, for "because you like" hints.
///
/// Ranking covers watched and watching entries; at most two genres are returned.
pub fn recommendation_reasons(lists: &Lists, item: &MediaItem) -> Vec<String> {
    let history = lists.watched.iter().chain(lists.watching.iter());
    let ranked = genre_weights::rank_genres(history);
    genre_weights::matching_genres(item, &ranked, 2)
}
