// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AgeRange, BoundingBox, CandidateQuery, Compatibility, CompatibilityFactors, Gender,
    GenderPreference, GeoPoint, InteractionRecord, Location, LookingFor, Match, MatchStatus,
    MatchType, PairKey, ProfileStats, ProfileStatus, Radius, RelationshipType, ReportReason, Stat,
    SwipeAction, UnknownVariant, UserProfile, DEFAULT_DISTANCE_MILES, MAX_AGE, MIN_AGE,
};
pub use requests::{LocationRequest, NearbyQuery, PageQuery, ReportRequest, SwipeRequest};
pub use responses::{
    DiscoverResponse, DiscoveryItem, DistanceResponse, ErrorResponse, HealthResponse,
    LikesResponse, MatchSummary, MatchesResponse, MessageResponse, NearbyResponse, NearbyUser,
    PublicProfile, ReceivedLike, SwipeResponse,
};
