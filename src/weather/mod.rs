pub mod openweather;
pub mod poller;
pub mod source;

pub use openweather::OpenWeatherClient;
pub use poller::{spawn_weather_poller, WeatherPollConfig};
pub use source::{JsonFileWeatherSource, StaticWeatherSource, WeatherSource};
