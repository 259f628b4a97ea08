use std::collections::HashSet;

use crate::core::distance::distance_miles;
use crate::models::{Compatibility, CompatibilityFactors, Location, RelationshipType, UserProfile};

/// Factor weights in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWeights {
    pub interests: u32,
    pub location: u32,
    pub activity: u32,
    pub preferences: u32,
}

pub const WEIGHTS: ScoringWeights = ScoringWeights {
    interests: 40,
    location: 20,
    activity: 20,
    preferences: 20,
};

const _: () = assert!(
    WEIGHTS.interests + WEIGHTS.location + WEIGHTS.activity + WEIGHTS.preferences == 100,
    "compatibility weights must sum to 100"
);

/// Interests factor when the scoring user listed no interests
pub const NEUTRAL_INTERESTS: u8 = 50;
/// Location factor when either side has no location
pub const UNKNOWN_LOCATION: u8 = 50;
pub const BOTH_ONLINE: u8 = 100;
pub const NOT_BOTH_ONLINE: u8 = 60;
/// Miles over which the location factor decays by a factor of e
pub const LOCATION_DECAY_MILES: f64 = 25.0;

/// Compute the compatibility of `candidate` as seen by `user`
///
/// Scoring formula:
/// score = round(
///     interests   * 0.40 +   # Shared interests over the larger set
///     location    * 0.20 +   # Closer = higher
///     activity    * 0.20 +   # Both online = 100, else 60
///     preferences * 0.20     # Relationship type alignment
/// )
///
/// Pure and deterministic: no clock, no I/O.
pub fn score(user: &UserProfile, candidate: &UserProfile) -> Compatibility {
    let factors = CompatibilityFactors {
        interests: interests_factor(&user.interests, &candidate.interests),
        location: location_factor(&user.location, &candidate.location),
        activity: activity_factor(user.is_online, candidate.is_online),
        preferences: preferences_factor(
            user.looking_for.relationship_type,
            candidate.looking_for.relationship_type,
        ),
    };

    Compatibility {
        score: weighted_total(&factors),
        factors,
    }
}

/// Overlap of the two interest sets relative to the larger one (0-100)
pub fn interests_factor(user: &[String], candidate: &[String]) -> u8 {
    let a: HashSet<&str> = user.iter().map(String::as_str).collect();
    let b: HashSet<&str> = candidate.iter().map(String::as_str).collect();

    if a.is_empty() {
        return NEUTRAL_INTERESTS;
    }

    let common = a.intersection(&b).count() as f64;
    let larger = a.len().max(b.len()) as f64;

    (100.0 * common / larger).round() as u8
}

/// Proximity factor (0-100), non-increasing in distance
pub fn location_factor(user: &Location, candidate: &Location) -> u8 {
    match (user.position(), candidate.position()) {
        (Some(a), Some(b)) if a.is_valid() && b.is_valid() => {
            location_factor_for_distance(distance_miles(a, b))
        }
        _ => UNKNOWN_LOCATION,
    }
}

/// Exponential decay: factor = 100 * e^(-miles / 25)
#[inline]
pub fn location_factor_for_distance(miles: f64) -> u8 {
    if !miles.is_finite() {
        return 0;
    }
    (100.0 * (-miles.max(0.0) / LOCATION_DECAY_MILES).exp())
        .round()
        .clamp(0.0, 100.0) as u8
}

#[inline]
pub fn activity_factor(user_online: bool, candidate_online: bool) -> u8 {
    if user_online && candidate_online {
        BOTH_ONLINE
    } else {
        NOT_BOTH_ONLINE
    }
}

/// Symmetric relationship-type alignment
#[inline]
pub fn preferences_factor(a: RelationshipType, b: RelationshipType) -> u8 {
    match (a, b) {
        (RelationshipType::Any, _) | (_, RelationshipType::Any) => 75,
        (a, b) if a == b => 100,
        _ => 25,
    }
}

/// Integer weighted sum, rounded half up
fn weighted_total(factors: &CompatibilityFactors) -> u8 {
    let sum = WEIGHTS.interests * u32::from(factors.interests)
        + WEIGHTS.location * u32::from(factors.location)
        + WEIGHTS.activity * u32::from(factors.activity)
        + WEIGHTS.preferences * u32::from(factors.preferences);

    ((sum + 50) / 100) as u8
}
