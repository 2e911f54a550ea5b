/// AniList GraphQL provider
///
/// All queries go to a single GraphQL endpoint. Page queries share one
/// document; the variables select search text, filters and sort order.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        AiringStatus, MediaId, MediaItem, MediaTitle, SearchFilters, Season, SortBy, SortOrder,
    },
    services::providers::MetadataProvider,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

const PAGE_SIZE: u32 = 24;
const SEASONAL_PAGE_SIZE: u32 = 20;

const MEDIA_FIELDS: &str = r#"
    id
    title { romaji english native }
    coverImage { large medium }
    description
    episodes
    duration
    genres
    status
    season
    seasonYear
    averageScore
    meanScore
    popularity
    studios { nodes { name } }
"#;

fn page_query() -> String {
    format!(
        r#"query ($search: String, $page: Int, $perPage: Int, $genre: String, $season: MediaSeason, $seasonYear: Int, $sort: [MediaSort]) {{
  Page(page: $page, perPage: $perPage) {{
    media(search: $search, genre: $genre, season: $season, seasonYear: $seasonYear, sort: $sort, type: ANIME) {{ {} }}
  }}
}}"#,
        MEDIA_FIELDS
    )
}

fn media_query() -> String {
    format!(
        r#"query ($id: Int) {{
  Media(id: $id, type: ANIME) {{ {} }}
}}"#,
        MEDIA_FIELDS
    )
}

// ============================================================================
// AniList API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "Page")]
    page: PageMedia,
}

#[derive(Debug, Deserialize)]
struct PageMedia {
    #[serde(default)]
    media: Vec<AniListMedia>,
}

#[derive(Debug, Deserialize)]
struct MediaData {
    #[serde(rename = "Media")]
    media: Option<AniListMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AniListMedia {
    id: MediaId,
    #[serde(default)]
    title: Option<MediaTitle>,
    #[serde(default)]
    cover_image: Option<AniListCoverImage>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    episodes: Option<u32>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    genres: Option<Vec<String>>,
    #[serde(default)]
    status: Option<AiringStatus>,
    #[serde(default)]
    season: Option<Season>,
    #[serde(default)]
    season_year: Option<i32>,
    #[serde(default)]
    average_score: Option<u32>,
    #[serde(default)]
    mean_score: Option<u32>,
    #[serde(default)]
    popularity: Option<u32>,
    #[serde(default)]
    studios: Option<AniListStudios>,
}

#[derive(Debug, Deserialize)]
struct AniListCoverImage {
    large: Option<String>,
    medium: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AniListStudios {
    #[serde(default)]
    nodes: Vec<AniListStudio>,
}

#[derive(Debug, Deserialize)]
struct AniListStudio {
    name: String,
}

impl From<AniListMedia> for MediaItem {
    fn from(media: AniListMedia) -> Self {
        MediaItem {
            id: media.id,
            title: media.title.unwrap_or_default(),
            cover_image: media.cover_image.and_then(|cover| cover.large.or(cover.medium)),
            description: media.description,
            episodes: media.episodes,
            duration: media.duration,
            genres: media.genres.unwrap_or_default(),
            status: media.status,
            season: media.season,
            season_year: media.season_year,
            average_score: media.average_score,
            mean_score: media.mean_score,
            popularity: media.popularity,
            studios: media
                .studios
                .map(|studios| studios.nodes.into_iter().map(|s| s.name).collect())
                .unwrap_or_default(),
        }
    }
}

/// AniList sort key for a search
///
/// Without an explicit sort, text searches rank by match and filter-only
/// searches by popularity.
fn sort_for(query: &str, filters: &SearchFilters) -> String {
    match filters.sort_by {
        Some(sort_by) => {
            let field = match sort_by {
                SortBy::Popularity => "POPULARITY",
                SortBy::Score => "SCORE",
                SortBy::Title => "TITLE_ROMAJI",
                SortBy::Date => "START_DATE",
            };
            match filters.sort_order.unwrap_or_default() {
                SortOrder::Asc => field.to_string(),
                SortOrder::Desc => format!("{}_DESC", field),
            }
        }
        None if query.trim().is_empty() => "POPULARITY_DESC".to_string(),
        None => "SEARCH_MATCH".to_string(),
    }
}

/// Variables for the page query
fn search_variables(query: &str, filters: &SearchFilters, page: u32) -> Value {
    let search = Some(query.trim()).filter(|search| !search.is_empty());
    json!({
        "search": search,
        "page": page,
        "perPage": PAGE_SIZE,
        "genre": filters.genre,
        "season": filters.season,
        "seasonYear": filters.year,
        "sort": [sort_for(query, filters)],
    })
}

#[derive(Clone)]
pub struct AniListProvider {
    http_client: HttpClient,
    api_url: String,
    cache: Option<Cache>,
    cache_ttl: u64,
}

impl AniListProvider {
    pub fn new(api_url: String, cache: Option<Cache>, cache_ttl: u64) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            cache,
            cache_ttl,
        }
    }

    /// Posts a GraphQL document and unwraps the response envelope
    async fn execute<T: DeserializeOwned>(&self, query: String, variables: Value) -> AppResult<T> {
        let response = self
            .http_client
            .post(&self.api_url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound("AniList returned 404".to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "AniList request failed");
            return Err(AppError::ExternalApi(format!(
                "AniList returned status {}: {}",
                status, body
            )));
        }

        let envelope: GraphQlResponse<T> = response.json().await?;
        if let Some(error) = envelope.errors.first() {
            return Err(AppError::ExternalApi(format!(
                "AniList query error: {}",
                error.message
            )));
        }

        envelope
            .data
            .ok_or_else(|| AppError::ExternalApi("AniList response missing data".to_string()))
    }

    async fn fetch_page(&self, variables: Value) -> AppResult<Vec<MediaItem>> {
        let data: PageData = self.execute(page_query(), variables).await?;
        Ok(data.page.media.into_iter().map(MediaItem::from).collect())
    }

    async fn fetch_media(&self, id: MediaId) -> AppResult<Option<MediaItem>> {
        match self
            .execute::<MediaData>(media_query(), json!({ "id": id }))
            .await
        {
            Ok(data) => Ok(data.media.map(MediaItem::from)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for AniListProvider {
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        page: u32,
    ) -> AppResult<Vec<MediaItem>> {
        let canonical = format!(
            "{}|{}|{}",
            query.trim(),
            serde_json::to_string(filters)?,
            page
        );
        let variables = search_variables(query, filters, page);

        let results: Vec<MediaItem> = cached!(
            self.cache.as_ref(),
            CacheKey::Search(canonical),
            self.cache_ttl,
            self.fetch_page(variables.clone())
        )?;

        tracing::info!(
            query = %query,
            genre = ?filters.genre,
            page,
            results = results.len(),
            provider = "anilist",
            "Catalog search completed"
        );

        Ok(results)
    }

    async fn get_by_id(&self, id: MediaId) -> AppResult<Option<MediaItem>> {
        cached!(
            self.cache.as_ref(),
            CacheKey::Media(id),
            self.cache_ttl,
            self.fetch_media(id)
        )
    }

    async fn get_popular(&self, page: u32) -> AppResult<Vec<MediaItem>> {
        let variables = json!({
            "page": page,
            "perPage": PAGE_SIZE,
            "sort": ["POPULARITY_DESC"],
        });

        cached!(
            self.cache.as_ref(),
            CacheKey::Popular(page),
            self.cache_ttl,
            self.fetch_page(variables.clone())
        )
    }

    async fn get_seasonal(&self, season: Season, year: i32) -> AppResult<Vec<MediaItem>> {
        let variables = json!({
            "page": 1,
            "perPage": SEASONAL_PAGE_SIZE,
            "season": season,
            "seasonYear": year,
            "sort": ["POPULARITY_DESC"],
        });

        cached!(
            self.cache.as_ref(),
            CacheKey::Seasonal(season, year),
            self.cache_ttl,
            self.fetch_page(variables.clone())
        )
    }

    fn name(&self) -> &'static str {
        "anilist"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_defaults() {
        let filters = SearchFilters::default();
        assert_eq!(sort_for("", &filters), "POPULARITY_DESC");
        assert_eq!(sort_for("   ", &filters), "POPULARITY_DESC");
        assert_eq!(sort_for("frieren", &filters), "SEARCH_MATCH");
    }

    #[test]
    fn test_sort_explicit() {
        let mut filters = SearchFilters {
            sort_by: Some(SortBy::Score),
            ..SearchFilters::default()
        };
        assert_eq!(sort_for("frieren", &filters), "SCORE_DESC");

        filters.sort_by = Some(SortBy::Title);
        filters.sort_order = Some(SortOrder::Asc);
        assert_eq!(sort_for("", &filters), "TITLE_ROMAJI");

        filters.sort_by = Some(SortBy::Date);
        filters.sort_order = Some(SortOrder::Desc);
        assert_eq!(sort_for("", &filters), "START_DATE_DESC");
    }

    #[test]
    fn test_search_variables() {
        let filters = SearchFilters {
            genre: Some("Sci-Fi".to_string()),
            season: Some(Season::Fall),
            year: Some(2023),
            ..SearchFilters::default()
        };
        let variables = search_variables(" ", &filters, 2);
        assert_eq!(variables["search"], Value::Null);
        assert_eq!(variables["page"], 2);
        assert_eq!(variables["perPage"], 24);
        assert_eq!(variables["genre"], "Sci-Fi");
        assert_eq!(variables["season"], "FALL");
        assert_eq!(variables["seasonYear"], 2023);
        assert_eq!(variables["sort"][0], "POPULARITY_DESC");
    }

    #[test]
    fn test_page_response_deserialization() {
        let json = r#"{
            "data": {
                "Page": {
                    "media": [{
                        "id": 154587,
                        "title": { "romaji": "Sousou no Frieren", "english": "Frieren: Beyond Journey's End", "native": null },
                        "coverImage": { "large": "https://img.example/large.jpg", "medium": "https://img.example/medium.jpg" },
                        "description": "An elf mage outlives her party.",
                        "episodes": 28,
                        "duration": 24,
                        "genres": ["Adventure", "Drama", "Fantasy"],
                        "status": "FINISHED",
                        "season": "FALL",
                        "seasonYear": 2023,
                        "averageScore": 91,
                        "meanScore": 91,
                        "popularity": 350000,
                        "studios": { "nodes": [{ "name": "Madhouse" }] }
                    }]
                }
            }
        }"#;

        let response: GraphQlResponse<PageData> = serde_json::from_str(json).unwrap();
        let items: Vec<MediaItem> = response
            .data
            .unwrap()
            .page
            .media
            .into_iter()
            .map(MediaItem::from)
            .collect();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.id, 154587);
        assert_eq!(item.display_title(), "Frieren: Beyond Journey's End");
        assert_eq!(item.genres, vec!["Adventure", "Drama", "Fantasy"]);
        assert_eq!(item.season, Some(Season::Fall));
        assert_eq!(item.cover_image.as_deref(), Some("https://img.example/large.jpg"));
        assert_eq!(item.studios, vec!["Madhouse"]);
    }

    #[test]
    fn test_null_genres_and_missing_media() {
        let json = r#"{ "data": { "Media": { "id": 1, "title": null, "genres": null } } }"#;
        let response: GraphQlResponse<MediaData> = serde_json::from_str(json).unwrap();
        let item = MediaItem::from(response.data.unwrap().media.unwrap());
        assert!(item.genres.is_empty());
        assert_eq!(item.display_title(), "");

        let json = r#"{ "data": { "Media": null }, "errors": [{ "message": "Not Found.", "status": 404 }] }"#;
        let response: GraphQlResponse<MediaData> = serde_json::from_str(json).unwrap();
        assert_eq!(response.errors[0].message, "Not Found.");
        assert!(response.data.unwrap().media.is_none());
    }
}
