pub mod loader;
pub mod ranking;
pub mod recommendation;

pub use loader::{FeedLoader, LoadedFeed};
pub use ranking::rank_listings;
pub use recommendation::weather_recommendation;
