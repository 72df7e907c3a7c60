/// Fixed relevance heuristics. These are product constants, not tunables:
/// the settings file does not expose them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Relevance weights
    pub weight_events: f64,
    pub weight_climate: f64,
    pub weight_category: f64,

    /// Climate comfort peaks at `comfort_temp_c` and reaches zero
    /// `comfort_span_c` degrees either side of it.
    pub comfort_temp_c: f64,
    pub comfort_span_c: f64,

    /// Badge thresholds (strictly greater than)
    pub event_badge_threshold: f64,
    pub trending_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_events: 0.6,
            weight_climate: 0.2,
            weight_category: 0.2,
            comfort_temp_c: 22.0,
            comfort_span_c: 22.0,
            event_badge_threshold: 0.6,
            trending_threshold: 0.75,
        }
    }
}
