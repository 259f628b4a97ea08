// Unit tests for Spark Match

use chrono::Utc;
use spark_match::core::{
    distance::{calculate_bounding_box, distance_miles, is_within_bounding_box, round_to_tenth},
    filters::{admits, build_candidate_query},
    scoring::{interests_factor, location_factor_for_distance, score},
};
use spark_match::models::{
    AgeRange, Gender, GenderPreference, GeoPoint, Location, LookingFor, ProfileStats,
    ProfileStatus, RelationshipType, UserProfile,
};
use std::collections::{BTreeSet, HashSet};

fn create_test_profile(id: &str, interests: &[&str], online: bool) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        name: format!("User {}", id),
        age: 25,
        gender: Gender::Female,
        bio: None,
        interests: interests.iter().map(|s| s.to_string()).collect(),
        location: Location::default(),
        looking_for: LookingFor::default(),
        blocked: BTreeSet::new(),
        reported: BTreeSet::new(),
        is_online: online,
        last_active: Utc::now(),
        status: ProfileStatus::Active,
        stats: ProfileStats::default(),
        created_at: Utc::now(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_distance_zero() {
    let point = GeoPoint::new(-74.0060, 40.7128);
    assert!(distance_miles(point, point) < 0.001);
}

#[test]
fn test_distance_manhattan_to_brooklyn() {
    // Roughly 6 miles
    let manhattan = GeoPoint::new(-73.9855, 40.7580);
    let brooklyn = GeoPoint::new(-73.9442, 40.6782);

    let distance = distance_miles(manhattan, brooklyn);
    assert!(distance > 4.0 && distance < 8.0, "got {}", distance);
    assert_eq!(round_to_tenth(distance), (distance * 10.0).round() / 10.0);
}

#[test]
fn test_point_within_bbox() {
    let center = GeoPoint::new(-74.0060, 40.7128);
    let bbox = calculate_bounding_box(center, 10.0);

    assert!(is_within_bounding_box(center, &bbox));
    assert!(is_within_bounding_box(GeoPoint::new(-74.0, 40.71), &bbox));
    assert!(!is_within_bounding_box(GeoPoint::new(-80.0, 50.0), &bbox));
    assert!(!is_within_bounding_box(GeoPoint::new(-74.0, bbox.max_lat + 0.01), &bbox));
}

#[test]
fn test_empty_interests_are_neutral_whatever_the_candidate_has() {
    for candidate in [vec![], strings(&["music"]), strings(&["a", "b", "c", "d"])] {
        assert_eq!(interests_factor(&[], &candidate), 50);
    }
}

#[test]
fn test_half_overlapping_interests() {
    let a = strings(&["travel", "music"]);
    let b = strings(&["music", "art"]);
    assert_eq!(interests_factor(&a, &b), 50);
}

#[test]
fn test_exact_score_with_fixed_inputs() {
    let a = create_test_profile("a", &["travel", "music"], true);
    let b = create_test_profile("b", &["music", "art"], false);

    let result = score(&a, &b);

    assert_eq!(result.factors.interests, 50);
    assert_eq!(result.factors.location, 50);
    assert_eq!(result.factors.activity, 60);
    assert_eq!(result.factors.preferences, 75);
    // 20 + 10 + 12 + 15
    assert_eq!(result.score, 57);
}

#[test]
fn test_score_symmetric_for_symmetric_fixtures() {
    let mut a = create_test_profile("a", &["hiking", "chess", "film"], true);
    let mut b = create_test_profile("b", &["film", "chess", "hiking"], true);
    a.looking_for.relationship_type = RelationshipType::Serious;
    b.looking_for.relationship_type = RelationshipType::Serious;
    a.location.point = GeoPoint::new(-74.0060, 40.7128);
    b.location.point = GeoPoint::new(-73.9442, 40.6782);

    let ab = score(&a, &b);
    let ba = score(&b, &a);

    assert_eq!(ab.score, ba.score);
    assert_eq!(ab.factors, ba.factors);
    assert_eq!(ab.factors.preferences, 100);
}

#[test]
fn test_score_is_deterministic() {
    let a = create_test_profile("a", &["music"], false);
    let b = create_test_profile("b", &["music", "art"], false);
    assert_eq!(score(&a, &b), score(&a, &b));
}

#[test]
fn test_location_factor_bounded_and_non_increasing() {
    let mut previous = 100;
    for tenth_miles in 0..5000 {
        let factor = location_factor_for_distance(f64::from(tenth_miles) / 10.0);
        assert!(factor <= previous);
        previous = factor;
    }
}

#[test]
fn test_filter_rules_are_a_conjunction() {
    let mut requester = create_test_profile("me", &[], false);
    requester.gender = Gender::Male;
    requester.location.point = GeoPoint::new(-74.0060, 40.7128);
    requester.looking_for = LookingFor {
        gender: vec![GenderPreference::Female],
        age_range: AgeRange { min: 20, max: 30 },
        distance: Some(25.0),
        ..LookingFor::default()
    };

    let query = build_candidate_query(&requester, HashSet::new());

    let mut ok = create_test_profile("ok", &[], false);
    ok.location.point = GeoPoint::new(-73.99, 40.72);
    assert!(admits(&query, &ok));

    let mut too_old = ok.clone();
    too_old.age = 31;
    assert!(!admits(&query, &too_old));

    let mut wrong_gender = ok.clone();
    wrong_gender.gender = Gender::Other;
    assert!(!admits(&query, &wrong_gender));

    let mut banned = ok.clone();
    banned.status = ProfileStatus::Banned;
    assert!(!admits(&query, &banned));

    let mut far = ok.clone();
    far.location.point = GeoPoint::new(-71.0589, 42.3601);
    assert!(!admits(&query, &far));
}

#[test]
fn test_empty_gender_preference_matches_nobody() {
    let mut requester = create_test_profile("me", &[], false);
    requester.looking_for.gender = vec![];

    let query = build_candidate_query(&requester, HashSet::new());

    for gender in [Gender::Male, Gender::Female, Gender::NonBinary, Gender::Other] {
        let mut candidate = create_test_profile("c", &[], false);
        candidate.gender = gender;
        assert!(!admits(&query, &candidate));
    }
}
