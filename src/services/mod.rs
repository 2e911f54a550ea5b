pub mod detail;
pub mod genre_weights;
pub mod list_store;
pub mod providers;
pub mod recommendations;

pub use detail::{DetailOpen, DetailPanel, DetailView};
pub use list_store::{Hydration, ListStore, MutationOutcome};
pub use providers::{AniListProvider, MetadataProvider};
pub use recommendations::{RecommendationEngine, RecommendationOutcome, Recommendations};
