use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::core::distance::is_within_radius;
use crate::core::error::{MatchError, MatchResult};
use crate::models::{CandidateQuery, Radius, UserProfile, MAX_AGE, MIN_AGE};
use crate::services::{InteractionLog, ProfileStore};

/// A stored profile that cannot be evaluated against the exclusion rules
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("profile {id} has out-of-range age {age}")]
    InvalidAge { id: String, age: u8 },

    #[error("profile {id} has invalid coordinates ({longitude}, {latitude})")]
    InvalidLocation { id: String, longitude: f64, latitude: f64 },

    #[error("profile {id} has an inverted age preference {min}-{max}")]
    InvalidAgeRange { id: String, min: u8, max: u8 },
}

/// Build the store query for a requester's discovery feed
///
/// `swiped` holds every target the requester has already swiped on.
pub fn build_candidate_query(requester: &UserProfile, swiped: HashSet<String>) -> CandidateQuery {
    let prefs = &requester.looking_for;

    let mut exclude_user_ids = swiped;
    exclude_user_ids.extend(requester.blocked.iter().cloned());
    exclude_user_ids.insert(requester.id.clone());

    let genders = if prefs.wants_all_genders() {
        None
    } else {
        Some(prefs.gender.iter().filter_map(|g| g.gender()).collect())
    };

    // Distance is best-effort: no usable location or radius means no rule
    let radius = match (requester.location.position(), prefs.distance) {
        (Some(center), Some(miles)) if center.is_valid() && miles > 0.0 => {
            Some(Radius { center, miles })
        }
        _ => None,
    };

    CandidateQuery {
        requester_id: requester.id.clone(),
        exclude_user_ids,
        genders,
        age_range: Some(prefs.age_range),
        radius,
    }
}

/// Check if a profile passes every exclusion rule of the query
#[inline]
pub fn admits(query: &CandidateQuery, candidate: &UserProfile) -> bool {
    if candidate.id == query.requester_id || query.exclude_user_ids.contains(&candidate.id) {
        return false;
    }

    // Never show someone who blocked the requester
    if candidate.has_blocked(&query.requester_id) {
        return false;
    }

    if !candidate.is_active() {
        return false;
    }

    if let Some(range) = query.age_range {
        if !range.contains(candidate.age) {
            return false;
        }
    }

    if let Some(genders) = &query.genders {
        if !genders.contains(&candidate.gender) {
            return false;
        }
    }

    if let Some(radius) = query.radius {
        match candidate.location.position() {
            Some(point) if point.is_valid() => {
                if !is_within_radius(radius.center, point, radius.miles) {
                    return false;
                }
            }
            _ => return false,
        }
    }

    true
}

/// Reject stored profiles whose data cannot be trusted for filtering
pub fn check_candidate(candidate: &UserProfile) -> Result<(), FilterError> {
    if candidate.age < MIN_AGE || candidate.age > MAX_AGE {
        return Err(FilterError::InvalidAge {
            id: candidate.id.clone(),
            age: candidate.age,
        });
    }

    let point = candidate.location.point;
    if !point.is_valid() {
        return Err(FilterError::InvalidLocation {
            id: candidate.id.clone(),
            longitude: point.longitude,
            latitude: point.latitude,
        });
    }

    let range = candidate.looking_for.age_range;
    if !range.is_valid() {
        return Err(FilterError::InvalidAgeRange {
            id: candidate.id.clone(),
            min: range.min,
            max: range.max,
        });
    }

    Ok(())
}

/// Produces the eligible candidates for a requester
#[derive(Clone)]
pub struct CandidateFilter {
    profiles: Arc<dyn ProfileStore>,
    interactions: Arc<dyn InteractionLog>,
}

impl CandidateFilter {
    pub fn new(profiles: Arc<dyn ProfileStore>, interactions: Arc<dyn InteractionLog>) -> Self {
        Self {
            profiles,
            interactions,
        }
    }

    /// One page of eligible candidates, in store order (by id)
    ///
    /// Malformed candidates are skipped and logged rather than failing the page.
    pub async fn filter_candidates(
        &self,
        requester: &UserProfile,
        page: u32,
        page_size: u32,
    ) -> MatchResult<Vec<UserProfile>> {
        if page == 0 || page_size == 0 {
            return Err(MatchError::InvalidArgument(
                "page and page size must be positive".to_string(),
            ));
        }

        let swiped = self.interactions.list_swiped_targets(&requester.id).await?;
        tracing::debug!("User {} has swiped on {} profiles", requester.id, swiped.len());

        let query = build_candidate_query(requester, swiped);
        let candidates = self
            .profiles
            .find_active_profiles(&query, page, page_size)
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|candidate| match check_candidate(candidate) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Skipping candidate for {}: {}", requester.id, e);
                    false
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AgeRange, Gender, GenderPreference, GeoPoint, Location, LookingFor, ProfileStats,
        ProfileStatus,
    };
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn create_test_profile(id: &str, age: u8, gender: Gender) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: format!("User {}", id),
            age,
            gender,
            bio: None,
            interests: vec![],
            location: Location {
                point: GeoPoint::new(-74.0060, 40.7128),
                ..Location::default()
            },
            looking_for: LookingFor::default(),
            blocked: BTreeSet::new(),
            reported: BTreeSet::new(),
            is_online: false,
            last_active: Utc::now(),
            status: ProfileStatus::Active,
            stats: ProfileStats::default(),
            created_at: Utc::now(),
        }
    }

    fn create_requester() -> UserProfile {
        let mut requester = create_test_profile("me", 27, Gender::Male);
        requester.looking_for = LookingFor {
            gender: vec![GenderPreference::Female],
            age_range: AgeRange { min: 20, max: 30 },
            distance: Some(25.0),
            ..LookingFor::default()
        };
        requester
    }

    fn query_for(requester: &UserProfile) -> CandidateQuery {
        build_candidate_query(requester, HashSet::new())
    }

    #[test]
    fn test_admits_matching_candidate() {
        let requester = create_requester();
        let candidate = create_test_profile("c", 25, Gender::Female);
        assert!(admits(&query_for(&requester), &candidate));
    }

    #[test]
    fn test_excludes_self() {
        let mut requester = create_requester();
        requester.gender = Gender::Female;
        requester.age = 25;
        assert!(!admits(&query_for(&requester), &requester));
    }

    #[test]
    fn test_excludes_blocked_and_swiped() {
        let mut requester = create_requester();
        requester.blocked.insert("blocked".to_string());
        let query = build_candidate_query(&requester, HashSet::from(["swiped".to_string()]));

        assert!(!admits(&query, &create_test_profile("blocked", 25, Gender::Female)));
        assert!(!admits(&query, &create_test_profile("swiped", 25, Gender::Female)));
    }

    #[test]
    fn test_excludes_candidate_who_blocked_requester() {
        let requester = create_requester();
        let mut candidate = create_test_profile("c", 25, Gender::Female);
        candidate.blocked.insert("me".to_string());
        assert!(!admits(&query_for(&requester), &candidate));
    }

    #[test]
    fn test_excludes_inactive() {
        let requester = create_requester();
        let mut candidate = create_test_profile("c", 25, Gender::Female);
        candidate.status = ProfileStatus::Paused;
        assert!(!admits(&query_for(&requester), &candidate));
    }

    #[test]
    fn test_age_and_gender_rules() {
        let requester = create_requester();
        let query = query_for(&requester);
        assert!(!admits(&query, &create_test_profile("old", 31, Gender::Female)));
        assert!(admits(&query, &create_test_profile("edge", 30, Gender::Female)));
        assert!(!admits(&query, &create_test_profile("m", 25, Gender::Male)));
    }

    #[test]
    fn test_all_disables_gender_rule() {
        let mut requester = create_requester();
        requester.looking_for.gender = vec![GenderPreference::Female, GenderPreference::All];
        let query = query_for(&requester);
        assert!(query.genders.is_none());
        assert!(admits(&query, &create_test_profile("m", 25, Gender::Male)));
    }

    #[test]
    fn test_radius_rule() {
        let requester = create_requester();
        let mut far = create_test_profile("far", 25, Gender::Female);
        // Philadelphia, roughly 80 miles away
        far.location.point = GeoPoint::new(-75.1652, 39.9526);
        assert!(!admits(&query_for(&requester), &far));

        let mut unset = create_test_profile("unset", 25, Gender::Female);
        unset.location.point = GeoPoint::UNSET;
        assert!(!admits(&query_for(&requester), &unset));
    }

    #[test]
    fn test_sentinel_requester_location_skips_radius() {
        let mut requester = create_requester();
        requester.location.point = GeoPoint::UNSET;
        let query = query_for(&requester);
        assert!(query.radius.is_none());

        let mut far = create_test_profile("far", 25, Gender::Female);
        far.location.point = GeoPoint::new(2.3522, 48.8566);
        assert!(admits(&query, &far));
    }

    #[test]
    fn test_check_candidate_rejects_malformed() {
        let mut young = create_test_profile("young", 16, Gender::Female);
        assert!(matches!(check_candidate(&young), Err(FilterError::InvalidAge { .. })));

        young.age = 20;
        young.location.point = GeoPoint::new(f64::NAN, 10.0);
        assert!(matches!(check_candidate(&young), Err(FilterError::InvalidLocation { .. })));

        young.location.point = GeoPoint::UNSET;
        young.looking_for.age_range = AgeRange { min: 40, max: 20 };
        assert!(matches!(check_candidate(&young), Err(FilterError::InvalidAgeRange { .. })));
    }
}
