//! Active-event count to intensity.
//!
//! Logistic curve: ~6 simultaneous events give 0.5, saturating smoothly
//! toward 1.0 above and 0.0 below, with no hard threshold.

const STEEPNESS: f64 = 0.35;
const MIDPOINT: f64 = 6.0;

pub fn intensity_for(active_count: usize) -> f64 {
    let x = active_count as f64;
    let y = 1.0 / (1.0 + (-STEEPNESS * (x - MIDPOINT)).exp());
    y.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn midpoint_is_half() {
        assert!((intensity_for(6) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn known_points_on_the_curve() {
        assert!((intensity_for(0) - 0.1091).abs() < 1e-4);
        assert!((intensity_for(10) - 0.8022).abs() < 1e-4);
        assert!(intensity_for(100) > 0.999);
    }

    proptest! {
        #[test]
        fn stays_within_unit_interval(count in 0usize..100_000) {
            let y = intensity_for(count);
            prop_assert!((0.0..=1.0).contains(&y));
        }

        #[test]
        fn never_decreases_with_more_events(a in 0usize..10_000, b in 0usize..10_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(intensity_for(lo) <= intensity_for(hi));
        }
    }
}
