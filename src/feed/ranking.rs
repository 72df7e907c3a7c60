use std::cmp::Ordering;

use crate::models::{ContextState, Listing};

/// One-shot relevance sort for display.
///
/// With an unprimed context the listings keep their natural order. Otherwise
/// they are sorted by descending relevance; listings without a context count
/// as 0.0 and ties keep their natural order.
pub fn rank_listings(mut listings: Vec<Listing>, context: &ContextState) -> Vec<Listing> {
    if !context.is_primed() {
        return listings;
    }

    let score = |listing: &Listing| context.relevance_of(&listing.id).unwrap_or(0.0);
    listings.sort_by(|a, b| match score(b).partial_cmp(&score(a)) {
        Some(order) => order,
        None => Ordering::Equal,
    });
    listings
}
