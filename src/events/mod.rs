pub mod csv;
pub mod ingestor;
pub mod schema;

pub use ingestor::{parse_feed, EventIngestor, EventSet, FeedSource, IngestReport, ParsedFeed};
