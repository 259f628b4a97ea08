//! Spark Match - discovery and swipe-to-match service for the Spark dating app
//!
//! This library provides the candidate filter, compatibility scorer, discovery
//! feed, swipe processor and match lifecycle, behind store traits with
//! in-memory and PostgreSQL implementations.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{Engine, EngineOptions, MatchError, MatchResult, SwipeOutcome};
pub use models::{Compatibility, Match, SwipeAction, UserProfile};
pub use services::{MemoryStore, PostgresStore};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    #[test]
    fn test_library_exports() {
        let bbox = core::calculate_bounding_box(GeoPoint::new(-74.0060, 40.7128), 10.0);
        assert!(bbox.min_lat < 40.7128);
    }
}
