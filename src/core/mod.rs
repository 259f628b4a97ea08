// Core matching pipeline exports
pub mod distance;
pub mod engine;
pub mod error;
pub mod feed;
pub mod filters;
pub mod lifecycle;
pub mod location;
pub mod locks;
pub mod retention;
pub mod scoring;
pub mod swipe;

pub use distance::{calculate_bounding_box, distance_miles, is_within_bounding_box, round_to_tenth};
pub use engine::{Engine, EngineOptions};
pub use error::{MatchError, MatchResult};
pub use feed::{DiscoveryEntry, DiscoveryFeed};
pub use filters::{admits, build_candidate_query, CandidateFilter};
pub use lifecycle::MatchLifecycle;
pub use location::{LocationService, NearbyEntry};
pub use locks::PairLocks;
pub use retention::{compact_expired_dislikes, spawn_dislike_sweeper};
pub use scoring::score;
pub use swipe::{SwipeOutcome, SwipeProcessor};
