use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{
    Compatibility, Gender, InteractionRecord, Location, Match, MatchType, SwipeAction, UserProfile,
};

/// Profile fields visible to other users
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    pub location: Location,
    pub is_online: bool,
    pub last_active: DateTime<Utc>,
}

impl From<&UserProfile> for PublicProfile {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            age: profile.age,
            gender: profile.gender,
            bio: profile.bio.clone(),
            interests: profile.interests.clone(),
            location: profile.location.clone(),
            is_online: profile.is_online,
            last_active: profile.last_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryItem {
    pub profile: PublicProfile,
    pub compatibility: Compatibility,
}

/// Response for the discovery feed endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub profiles: Vec<DiscoveryItem>,
    pub page: u32,
}

/// Match as seen by one of its two users
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub id: Uuid,
    pub user_id: String,
    pub initiator: String,
    #[serde(rename = "type")]
    pub match_type: MatchType,
    pub compatibility: Compatibility,
    pub message_count: u32,
    pub last_interaction: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl MatchSummary {
    pub fn for_viewer(m: &Match, viewer_id: &str) -> Self {
        Self {
            id: m.id,
            user_id: m.other_user(viewer_id).unwrap_or_default().to_string(),
            initiator: m.initiator.clone(),
            match_type: m.match_type,
            compatibility: m.compatibility,
            message_count: m.message_count,
            last_interaction: m.last_interaction,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeResponse {
    pub matched: bool,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub new_match: Option<MatchSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchSummary>,
    pub page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedLike {
    pub user_id: String,
    pub action: SwipeAction,
    pub created_at: DateTime<Utc>,
}

impl From<&InteractionRecord> for ReceivedLike {
    fn from(record: &InteractionRecord) -> Self {
        Self {
            user_id: record.from.clone(),
            action: record.action,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikesResponse {
    pub likes: Vec<ReceivedLike>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyUser {
    pub profile: PublicProfile,
    /// Miles, rounded to one decimal
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyResponse {
    pub users: Vec<NearbyUser>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceResponse {
    pub user_id: String,
    pub distance: f64,
    pub unit: String,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
