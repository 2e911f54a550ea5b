mod handlers;
mod routes;
mod state;

pub use handlers::{AddEntryRequest, RecommendedItem, SearchParams};
pub use routes::create_router;
pub use state::AppState;
