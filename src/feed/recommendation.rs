/// Banner text for the current temperature.
pub fn weather_recommendation(temperature_c: f64) -> &'static str {
    if temperature_c < 15.0 {
        "It's chilly! Check out jackets and warm clothing."
    } else if (15.0..=28.0).contains(&temperature_c) {
        "Perfect weather, browse all categories!"
    } else {
        "Feeling the heat? Maybe grab a fan or summer wear!"
    }
}
