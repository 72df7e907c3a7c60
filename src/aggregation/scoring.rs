use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::aggregation::config::ScoringConfig;
use crate::models::{Badge, ContextState, Listing, ListingContext, WeatherSnapshot};

/// Fallback boost for categories without an entry in the table.
const NEUTRAL_CATEGORY_BOOST: f64 = 0.4;

/// Comfort score in 0.0..=1.0. No reading means no climate boost.
pub fn climate_score(weather: Option<&WeatherSnapshot>, config: &ScoringConfig) -> f64 {
    let Some(weather) = weather else {
        return 0.0;
    };
    let comfort = 1.0 - (weather.temperature_c - config.comfort_temp_c).abs() / config.comfort_span_c;
    if comfort.is_nan() {
        return 0.0;
    }
    comfort.clamp(0.0, 1.0)
}

/// Cold weather favors clothing, warm weather favors outdoor gear.
pub fn category_boost(category: Option<&str>, climate: f64) -> f64 {
    match category {
        Some("Clothing") => {
            if climate < 0.5 {
                1.0
            } else {
                0.3
            }
        }
        Some("Electronics") => 0.6,
        Some("Home") => 0.5,
        Some("Outdoor") => {
            if climate > 0.6 {
                0.9
            } else {
                0.4
            }
        }
        _ => NEUTRAL_CATEGORY_BOOST,
    }
}

pub fn relevance_score(event_intensity: f64, climate: f64, boost: f64, config: &ScoringConfig) -> f64 {
    let raw = config.weight_events * event_intensity
        + config.weight_climate * climate
        + config.weight_category * boost;
    raw.clamp(0.0, 1.0)
}

/// Event-nearby first, then trending. Both thresholds are strict.
pub fn badges_for(score: f64, event_intensity: f64, config: &ScoringConfig) -> Vec<Badge> {
    let mut badges = Vec::new();
    if event_intensity > config.event_badge_threshold {
        badges.push(Badge::EventNearby);
    }
    if score > config.trending_threshold {
        badges.push(Badge::Trending);
    }
    badges
}

pub fn score_listing(
    listing: &Listing,
    event_intensity: f64,
    climate: f64,
    config: &ScoringConfig,
) -> ListingContext {
    let boost = category_boost(listing.category(), climate);
    let relevance_score = relevance_score(event_intensity, climate, boost, config);
    ListingContext {
        listing_id: listing.id.clone(),
        relevance_score,
        badges: badges_for(relevance_score, event_intensity, config),
    }
}

/// Full recomputation from one consistent snapshot of all three inputs.
pub fn compute_context(
    event_intensity: f64,
    weather: Option<&WeatherSnapshot>,
    listings: &[Listing],
    listings_revision: u64,
    computed_at: DateTime<Utc>,
    config: &ScoringConfig,
) -> ContextState {
    let climate = climate_score(weather, config);
    let listing_contexts: HashMap<String, ListingContext> = listings
        .iter()
        .map(|listing| {
            let ctx = score_listing(listing, event_intensity, climate, config);
            (listing.id.clone(), ctx)
        })
        .collect();

    ContextState {
        climate_score: climate,
        event_intensity,
        listing_contexts,
        listings_revision,
        computed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cfg() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn listing(id: &str, category: &str) -> Listing {
        Listing {
            id: id.into(),
            title: format!("listing {id}"),
            category: category.into(),
            ..Listing::default()
        }
    }

    #[test]
    fn climate_peaks_at_22_and_fades_linearly() {
        let score = |t: f64| climate_score(Some(&WeatherSnapshot::with_temperature(t)), &cfg());
        assert_eq!(score(22.0), 1.0);
        assert_eq!(score(11.0), 0.5);
        assert_eq!(score(33.0), 0.5);
        assert_eq!(score(0.0), 0.0);
        assert_eq!(score(44.0), 0.0);
        assert_eq!(score(-10.0), 0.0);
        assert_eq!(score(50.0), 0.0);
    }

    #[test]
    fn padded_category_gets_the_default_boost() {
        let state = compute_context(
            0.0,
            None,
            &[listing("exact", "Clothing"), listing("padded", "Clothing ")],
            1,
            chrono::DateTime::<Utc>::UNIX_EPOCH,
            &cfg(),
        );
        let score = |id: &str| state.listing_contexts[id].relevance_score;
        assert!((score("exact") - 0.2 * 1.0).abs() < 1e-12);
        assert!((score("padded") - 0.2 * NEUTRAL_CATEGORY_BOOST).abs() < 1e-12);
    }

    #[test]
    fn no_weather_is_neutral() {
        assert_eq!(climate_score(None, &cfg()), 0.0);
    }

    #[test]
    fn category_table() {
        assert_eq!(category_boost(Some("Clothing"), 0.2), 1.0);
        assert_eq!(category_boost(Some("Clothing"), 0.5), 0.3);
        assert_eq!(category_boost(Some("Electronics"), 0.9), 0.6);
        assert_eq!(category_boost(Some("Home"), 0.1), 0.5);
        assert_eq!(category_boost(Some("Outdoor"), 0.61), 0.9);
        assert_eq!(category_boost(Some("Outdoor"), 0.6), 0.4);
        assert_eq!(category_boost(Some("Books"), 0.6), 0.4);
        assert_eq!(category_boost(None, 0.6), 0.4);
    }

    #[test]
    fn score_bounds_are_reachable_exactly() {
        assert_eq!(relevance_score(1.0, 1.0, 1.0, &cfg()), 1.0);
        assert_eq!(relevance_score(0.0, 0.0, 0.0, &cfg()), 0.0);
    }

    #[test]
    fn badge_thresholds_are_strict() {
        assert!(badges_for(0.5, 0.6, &cfg()).is_empty());
        assert_eq!(badges_for(0.5, 0.61, &cfg()), vec![Badge::EventNearby]);
        assert!(badges_for(0.75, 0.0, &cfg()).is_empty());
        assert_eq!(badges_for(0.76, 0.0, &cfg()), vec![Badge::Trending]);
        assert_eq!(
            badges_for(0.9, 0.9, &cfg()),
            vec![Badge::EventNearby, Badge::Trending]
        );
    }

    #[test]
    fn compute_context_scores_every_listing() {
        let weather = WeatherSnapshot::with_temperature(22.0);
        let listings = vec![listing("jacket", "Clothing"), listing("tent", "Outdoor"), listing("misc", "")];
        let state = compute_context(0.5, Some(&weather), &listings, 3, Utc::now(), &cfg());

        assert_eq!(state.climate_score, 1.0);
        assert_eq!(state.event_intensity, 0.5);
        assert_eq!(state.listings_revision, 3);
        assert_eq!(state.listing_contexts.len(), 3);

        let tent = &state.listing_contexts["tent"];
        assert!((tent.relevance_score - (0.3 + 0.2 + 0.18)).abs() < 1e-12);
        assert!(tent.badges.is_empty());
        let jacket = &state.listing_contexts["jacket"];
        assert!((jacket.relevance_score - (0.3 + 0.2 + 0.06)).abs() < 1e-12);
    }

    #[test]
    fn busy_city_marks_listings() {
        let listings = vec![listing("tent", "Outdoor")];
        let weather = WeatherSnapshot::with_temperature(22.0);
        let state = compute_context(0.95, Some(&weather), &listings, 1, Utc::now(), &cfg());
        let tent = &state.listing_contexts["tent"];
        assert_eq!(tent.badges, vec![Badge::EventNearby, Badge::Trending]);
    }

    proptest! {
        #[test]
        fn relevance_stays_in_unit_interval(
            intensity in 0.0f64..=1.0,
            temp in -60.0f64..60.0,
            category in prop::sample::select(vec!["Clothing", "Electronics", "Home", "Outdoor", "Other", ""]),
        ) {
            let weather = WeatherSnapshot::with_temperature(temp);
            let state = compute_context(intensity, Some(&weather), &[listing("x", category)], 1, Utc::now(), &cfg());
            let score = state.listing_contexts["x"].relevance_score;
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
