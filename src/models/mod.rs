pub mod context;
pub mod event;
pub mod listing;
pub mod reading;
pub mod weather;

pub use context::{Badge, ContextState, ListingContext};
pub use event::{EventRecord, UNTITLED_EVENT};
pub use listing::Listing;
pub use reading::SensorReading;
pub use weather::WeatherSnapshot;
