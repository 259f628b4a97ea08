use chrono::Utc;
use std::sync::Arc;

use crate::core::distance::{distance_miles, round_to_tenth};
use crate::core::error::{MatchError, MatchResult};
use crate::models::{
    CandidateQuery, GeoPoint, Location, Radius, UserProfile, DEFAULT_DISTANCE_MILES,
};
use crate::services::ProfileStore;

/// A nearby profile with its distance from the requester in miles
#[derive(Debug, Clone)]
pub struct NearbyEntry {
    pub profile: UserProfile,
    pub distance: f64,
}

/// Location updates and proximity lookups
#[derive(Clone)]
pub struct LocationService {
    profiles: Arc<dyn ProfileStore>,
}

impl LocationService {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    pub async fn update_location(
        &self,
        user_id: &str,
        point: GeoPoint,
        city: Option<String>,
        country: Option<String>,
    ) -> MatchResult<Location> {
        if !point.is_valid() {
            return Err(MatchError::InvalidArgument(format!(
                "Invalid coordinates ({}, {})",
                point.latitude, point.longitude
            )));
        }
        if !point.is_set() {
            return Err(MatchError::InvalidArgument(
                "(0, 0) is not a valid location".to_string(),
            ));
        }

        let location = Location {
            point,
            city,
            country,
            last_updated: Some(Utc::now()),
        };
        self.profiles
            .update_location(user_id, location.clone())
            .await?;

        tracing::info!("Updated location for user {}", user_id);
        Ok(location)
    }

    /// Active users within `miles` of the requester, closest first within
    /// the page
    pub async fn nearby(
        &self,
        user_id: &str,
        miles: Option<f64>,
        page: u32,
        page_size: u32,
    ) -> MatchResult<Vec<NearbyEntry>> {
        if page == 0 || page_size == 0 {
            return Err(MatchError::InvalidArgument(
                "page and page size must be positive".to_string(),
            ));
        }

        let requester = self.require_profile(user_id).await?;
        let center = requester
            .location
            .position()
            .ok_or_else(|| {
                MatchError::InvalidArgument("Please update your location first".to_string())
            })?;

        let miles = miles.unwrap_or(DEFAULT_DISTANCE_MILES);
        if !miles.is_finite() || miles <= 0.0 {
            return Err(MatchError::InvalidArgument(format!("Invalid distance {}", miles)));
        }

        let mut query = CandidateQuery::for_requester(user_id);
        query
            .exclude_user_ids
            .extend(requester.blocked.iter().cloned());
        query.radius = Some(Radius { center, miles });

        let mut entries: Vec<NearbyEntry> = self
            .profiles
            .find_active_profiles(&query, page, page_size)
            .await?
            .into_iter()
            .filter_map(|profile| {
                let point = profile.location.position()?;
                Some(NearbyEntry {
                    distance: round_to_tenth(distance_miles(center, point)),
                    profile,
                })
            })
            .collect();

        entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        tracing::debug!(
            "Found {} users within {} miles of {}",
            entries.len(),
            miles,
            user_id
        );
        Ok(entries)
    }

    /// Distance in miles between two users, rounded to one decimal
    pub async fn distance_between(&self, user_id: &str, other_id: &str) -> MatchResult<f64> {
        let user = self.require_profile(user_id).await?;
        let other = self.require_profile(other_id).await?;

        match (user.location.position(), other.location.position()) {
            (Some(a), Some(b)) => Ok(round_to_tenth(distance_miles(a, b))),
            _ => Err(MatchError::NotFound(
                "Location not available".to_string(),
            )),
        }
    }

    async fn require_profile(&self, id: &str) -> MatchResult<UserProfile> {
        self.profiles
            .get_profile(id)
            .await?
            .ok_or_else(|| MatchError::NotFound("User not found".to_string()))
    }
}
