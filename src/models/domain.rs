use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Youngest age a profile may carry
pub const MIN_AGE: u8 = 18;
/// Oldest age a profile may carry
pub const MAX_AGE: u8 = 100;
/// Default search radius in miles
pub const DEFAULT_DISTANCE_MILES: f64 = 50.0;

/// A stored enum value that does not name any known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Text form shared by serde, the database columns and request parsing
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other,
}

text_enum!(Gender {
    Male => "male",
    Female => "female",
    NonBinary => "non-binary",
    Other => "other",
});

/// Gender a user wants to see; `All` disables the gender rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenderPreference {
    Male,
    Female,
    NonBinary,
    Other,
    All,
}

text_enum!(GenderPreference {
    Male => "male",
    Female => "female",
    NonBinary => "non-binary",
    Other => "other",
    All => "all",
});

impl GenderPreference {
    /// The concrete gender this preference names, `None` for `All`
    pub fn gender(&self) -> Option<Gender> {
        match self {
            GenderPreference::Male => Some(Gender::Male),
            GenderPreference::Female => Some(Gender::Female),
            GenderPreference::NonBinary => Some(Gender::NonBinary),
            GenderPreference::Other => Some(Gender::Other),
            GenderPreference::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Casual,
    Serious,
    Friendship,
    Any,
}

text_enum!(RelationshipType {
    Casual => "casual",
    Serious => "serious",
    Friendship => "friendship",
    Any => "any",
});

impl Default for RelationshipType {
    fn default() -> Self {
        RelationshipType::Any
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Active,
    Paused,
    Banned,
    Deleted,
}

text_enum!(ProfileStatus {
    Active => "active",
    Paused => "paused",
    Banned => "banned",
    Deleted => "deleted",
});

/// Geographic point. (0, 0) is the "not yet set" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub const UNSET: GeoPoint = GeoPoint {
        longitude: 0.0,
        latitude: 0.0,
    };

    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    pub fn is_set(&self) -> bool {
        !(self.longitude == 0.0 && self.latitude == 0.0)
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub point: GeoPoint,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Location {
    /// The point, unless it is still the unset sentinel
    pub fn position(&self) -> Option<GeoPoint> {
        self.point.is_set().then_some(self.point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

impl AgeRange {
    pub fn contains(&self, age: u8) -> bool {
        age >= self.min && age <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

impl Default for AgeRange {
    fn default() -> Self {
        Self { min: MIN_AGE, max: 50 }
    }
}

/// What a user is looking for in discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookingFor {
    #[serde(default = "default_gender_preferences")]
    pub gender: Vec<GenderPreference>,
    #[serde(default)]
    pub age_range: AgeRange,
    /// Search radius in miles
    #[serde(default = "default_distance")]
    pub distance: Option<f64>,
    #[serde(default)]
    pub relationship_type: RelationshipType,
}

impl LookingFor {
    pub fn wants_all_genders(&self) -> bool {
        self.gender.contains(&GenderPreference::All)
    }
}

impl Default for LookingFor {
    fn default() -> Self {
        Self {
            gender: default_gender_preferences(),
            age_range: AgeRange::default(),
            distance: default_distance(),
            relationship_type: RelationshipType::Any,
        }
    }
}

fn default_gender_preferences() -> Vec<GenderPreference> {
    vec![GenderPreference::All]
}

fn default_distance() -> Option<f64> {
    Some(DEFAULT_DISTANCE_MILES)
}

/// Denormalized display counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub likes: u32,
    pub super_likes: u32,
    pub matches: u32,
    pub profile_views: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    Likes,
    SuperLikes,
    Matches,
}

impl Stat {
    /// Column holding the counter in the profiles table
    pub fn column(&self) -> &'static str {
        match self {
            Stat::Likes => "likes",
            Stat::SuperLikes => "super_likes",
            Stat::Matches => "matches",
        }
    }

    pub fn bump(&self, stats: &mut ProfileStats) {
        let counter = match self {
            Stat::Likes => &mut stats.likes,
            Stat::SuperLikes => &mut stats.super_likes,
            Stat::Matches => &mut stats.matches,
        };
        *counter = counter.saturating_add(1);
    }
}

/// User profile with demographic, location and preference data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub looking_for: LookingFor,
    #[serde(default)]
    pub blocked: BTreeSet<String>,
    #[serde(default)]
    pub reported: BTreeSet<String>,
    #[serde(default)]
    pub is_online: bool,
    pub last_active: DateTime<Utc>,
    pub status: ProfileStatus,
    #[serde(default)]
    pub stats: ProfileStats,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn is_active(&self) -> bool {
        self.status == ProfileStatus::Active
    }

    pub fn has_blocked(&self, user_id: &str) -> bool {
        self.blocked.contains(user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Dislike,
    Superlike,
}

text_enum!(SwipeAction {
    Like => "like",
    Dislike => "dislike",
    Superlike => "superlike",
});

impl SwipeAction {
    /// Likes and superlikes count towards reciprocity
    pub fn is_positive(&self) -> bool {
        !matches!(self, SwipeAction::Dislike)
    }
}

/// One swipe decision, unique per ordered (from, to) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub from: String,
    pub to: String,
    pub action: SwipeAction,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Match,
    SuperlikeMatch,
}

text_enum!(MatchType {
    Match => "match",
    SuperlikeMatch => "superlike_match",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Unmatched,
    Blocked,
}

text_enum!(MatchStatus {
    Active => "active",
    Unmatched => "unmatched",
    Blocked => "blocked",
});

/// Per-factor compatibility values, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompatibilityFactors {
    pub interests: u8,
    pub location: u8,
    pub activity: u8,
    pub preferences: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Compatibility {
    pub score: u8,
    pub factors: CompatibilityFactors,
}

/// Unordered pair of user ids, stored sorted
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub low: String,
    pub high: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self { low: a.to_string(), high: b.to_string() }
        } else {
            Self { low: b.to_string(), high: a.to_string() }
        }
    }
}

/// Confirmed mutual match between two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: Uuid,
    pub users: [String; 2],
    pub initiator: String,
    #[serde(rename = "type")]
    pub match_type: MatchType,
    pub compatibility: Compatibility,
    pub status: MatchStatus,
    pub unmatched_by: Option<String>,
    pub unmatched_at: Option<DateTime<Utc>>,
    pub last_interaction: DateTime<Utc>,
    pub message_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn new(
        users: [String; 2],
        initiator: String,
        match_type: MatchType,
        compatibility: Compatibility,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            users,
            initiator,
            match_type,
            compatibility,
            status: MatchStatus::Active,
            unmatched_by: None,
            unmatched_at: None,
            last_interaction: now,
            message_count: 0,
            created_at: now,
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u == user_id)
    }

    pub fn other_user(&self, user_id: &str) -> Option<&str> {
        if !self.involves(user_id) {
            return None;
        }
        self.users
            .iter()
            .find(|u| u.as_str() != user_id)
            .map(String::as_str)
    }

    pub fn pair(&self) -> PairKey {
        PairKey::new(&self.users[0], &self.users[1])
    }

    pub fn is_active(&self) -> bool {
        self.status == MatchStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    Fake,
    Inappropriate,
    Harassment,
    Spam,
    Other,
}

text_enum!(ReportReason {
    Fake => "fake",
    Inappropriate => "inappropriate",
    Harassment => "harassment",
    Spam => "spam",
    Other => "other",
});

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Search circle in miles around a center point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radius {
    pub center: GeoPoint,
    pub miles: f64,
}

/// Store-level candidate query
///
/// `None` on an optional field means the rule is not applied.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    pub requester_id: String,
    pub exclude_user_ids: HashSet<String>,
    pub genders: Option<Vec<Gender>>,
    pub age_range: Option<AgeRange>,
    pub radius: Option<Radius>,
}

impl CandidateQuery {
    /// Query with only the identity exclusions applied
    pub fn for_requester(requester_id: &str) -> Self {
        Self {
            requester_id: requester_id.to_string(),
            exclude_user_ids: HashSet::from([requester_id.to_string()]),
            genders: None,
            age_range: None,
            radius: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_text_round_trip_names() {
        assert_eq!(Gender::NonBinary.as_str(), "non-binary");
        assert_eq!("superlike_match".parse::<MatchType>().unwrap(), MatchType::SuperlikeMatch);
        assert_eq!(
            serde_json::to_string(&MatchType::SuperlikeMatch).unwrap(),
            "\"superlike_match\""
        );
        assert_eq!(serde_json::to_string(&Gender::NonBinary).unwrap(), "\"non-binary\"");
    }

    #[test]
    fn test_unknown_variant() {
        let err = "wink".parse::<SwipeAction>().unwrap_err();
        assert_eq!(err.kind, "SwipeAction");
        assert_eq!(err.to_string(), "unknown SwipeAction 'wink'");
    }

    #[test]
    fn test_sentinel_location() {
        let location = Location::default();
        assert!(location.position().is_none());

        let set = Location {
            point: GeoPoint::new(-74.0060, 40.7128),
            ..Location::default()
        };
        assert_eq!(set.position(), Some(GeoPoint::new(-74.0060, 40.7128)));
    }

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(180.0, -90.0).is_valid());
        assert!(!GeoPoint::new(181.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn test_pair_key_is_order_insensitive() {
        assert_eq!(PairKey::new("b", "a"), PairKey::new("a", "b"));
        assert_eq!(PairKey::new("b", "a").low, "a");
    }

    #[test]
    fn test_match_other_user() {
        let m = Match::new(
            ["a".to_string(), "b".to_string()],
            "b".to_string(),
            MatchType::Match,
            Compatibility::default(),
            Utc::now(),
        );
        assert_eq!(m.other_user("a"), Some("b"));
        assert_eq!(m.other_user("b"), Some("a"));
        assert_eq!(m.other_user("c"), None);
        assert!(m.is_active());
    }

    #[test]
    fn test_stat_bump() {
        let mut stats = ProfileStats::default();
        Stat::SuperLikes.bump(&mut stats);
        Stat::SuperLikes.bump(&mut stats);
        Stat::Matches.bump(&mut stats);
        assert_eq!(stats.super_likes, 2);
        assert_eq!(stats.matches, 1);
        assert_eq!(stats.likes, 0);
    }
}
