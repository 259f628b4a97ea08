// Criterion benchmarks for Spark Match

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spark_match::core::feed::score_within_budget;
use spark_match::core::{admits, build_candidate_query, calculate_bounding_box, distance_miles, score};
use spark_match::models::{
    AgeRange, Gender, GenderPreference, GeoPoint, Location, LookingFor, ProfileStats,
    ProfileStatus, UserProfile,
};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

const NEW_YORK: GeoPoint = GeoPoint {
    longitude: -74.0060,
    latitude: 40.7128,
};

const INTERESTS: [&str; 6] = ["music", "travel", "art", "hiking", "film", "cooking"];

fn create_candidate(id: usize, lat: f64, lon: f64) -> UserProfile {
    UserProfile {
        id: format!("user-{:05}", id),
        email: format!("user{}@example.com", id),
        name: format!("User {}", id),
        age: 25 + (id % 10) as u8,
        gender: if id % 2 == 0 { Gender::Female } else { Gender::Male },
        bio: None,
        interests: INTERESTS
            .iter()
            .skip(id % 3)
            .take(3)
            .map(|s| s.to_string())
            .collect(),
        location: Location {
            point: GeoPoint::new(lon, lat),
            ..Location::default()
        },
        looking_for: LookingFor::default(),
        blocked: BTreeSet::new(),
        reported: BTreeSet::new(),
        is_online: id % 3 == 0,
        last_active: Utc::now(),
        status: ProfileStatus::Active,
        stats: ProfileStats::default(),
        created_at: Utc::now(),
    }
}

fn create_requester() -> UserProfile {
    let mut requester = create_candidate(999_999, NEW_YORK.latitude, NEW_YORK.longitude);
    requester.looking_for = LookingFor {
        gender: vec![GenderPreference::Female],
        age_range: AgeRange { min: 21, max: 35 },
        distance: Some(30.0),
        ..LookingFor::default()
    };
    requester
}

fn create_candidates(count: usize) -> Vec<UserProfile> {
    (0..count)
        .map(|i| {
            let lat_offset = (i as f64 * 0.001) % 0.5;
            let lon_offset = (i as f64 * 0.001) % 0.5;
            create_candidate(i, NEW_YORK.latitude + lat_offset, NEW_YORK.longitude + lon_offset)
        })
        .collect()
}

fn bench_distance(c: &mut Criterion) {
    let other = GeoPoint::new(-74.01, 40.72);
    c.bench_function("distance_miles", |b| {
        b.iter(|| distance_miles(black_box(NEW_YORK), black_box(other)));
    });
}

fn bench_bounding_box(c: &mut Criterion) {
    c.bench_function("bounding_box_calculation", |b| {
        b.iter(|| calculate_bounding_box(black_box(NEW_YORK), black_box(50.0)));
    });
}

fn bench_scoring(c: &mut Criterion) {
    let requester = create_requester();
    let candidate = create_candidate(1, 40.72, -74.01);

    c.bench_function("compatibility_score", |b| {
        b.iter(|| score(black_box(&requester), black_box(&candidate)));
    });
}

fn bench_feed_page(c: &mut Criterion) {
    let requester = create_requester();
    let mut group = c.benchmark_group("feed_page");

    for candidate_count in [10, 50, 100, 500].iter() {
        let candidates = create_candidates(*candidate_count);

        group.bench_with_input(
            BenchmarkId::new("score_within_budget", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| {
                    score_within_budget(
                        black_box(&requester),
                        black_box(candidates.clone()),
                        Duration::from_millis(200),
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_filtering_pipeline(c: &mut Criterion) {
    let requester = create_requester();
    let candidates = create_candidates(1000);
    let swiped: HashSet<String> = candidates
        .iter()
        .step_by(7)
        .map(|p| p.id.clone())
        .collect();
    let query = build_candidate_query(&requester, swiped);

    c.bench_function("filtering_pipeline_1000_candidates", |b| {
        b.iter(|| {
            let admitted: Vec<_> = candidates.iter().filter(|p| admits(&query, p)).collect();
            black_box(admitted)
        });
    });
}

criterion_group!(
    benches,
    bench_distance,
    bench_bounding_box,
    bench_scoring,
    bench_feed_page,
    bench_filtering_pipeline
);

criterion_main!(benches);
