pub mod aggregator;
pub mod config;
pub mod scoring;

pub use aggregator::ContextAggregator;
pub use config::ScoringConfig;
pub use scoring::{badges_for, category_boost, climate_score, compute_context, relevance_score};
