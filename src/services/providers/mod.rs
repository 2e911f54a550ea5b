/// Metadata provider abstraction
///
/// The catalog that media items come from. Implementations wrap a remote
/// service; the list store and recommendation engine depend only on this trait.
use crate::{
    error::AppResult,
    models::{MediaId, MediaItem, SearchFilters, Season},
};

pub mod anilist;

pub use anilist::AniListProvider;

/// Trait for media catalog providers
///
/// Failures are returned as errors rather than empty results so callers can
/// tell "nothing matched" from "the provider is down".
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search the catalog by free text and filters
    ///
    /// A blank query returns the filtered catalog ranked by popularity.
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        page: u32,
    ) -> AppResult<Vec<MediaItem>>;

    /// Fetch a single item, `None` when the catalog has no such id
    async fn get_by_id(&self, id: MediaId) -> AppResult<Option<MediaItem>>;

    /// Most popular items, one page
    async fn get_popular(&self, page: u32) -> AppResult<Vec<MediaItem>>;

    /// Most popular items of a broadcast season
    async fn get_seasonal(&self, season: Season, year: i32) -> AppResult<Vec<MediaItem>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
