use geo::{HaversineDistance, Point};

use crate::models::{BoundingBox, GeoPoint};

/// Metres in one statute mile
pub const METERS_PER_MILE: f64 = 1609.34;

/// Mean earth radius, as used by `geo`'s haversine
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Great-circle distance between two points in miles
///
/// Callers must not pass the unset sentinel; see [`GeoPoint::is_set`].
#[inline]
pub fn distance_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    let from = Point::new(a.longitude, a.latitude);
    let to = Point::new(b.longitude, b.latitude);
    from.haversine_distance(&to) / METERS_PER_MILE
}

/// Round a distance to one decimal for display
#[inline]
pub fn round_to_tenth(miles: f64) -> f64 {
    (miles * 10.0).round() / 10.0
}

/// Calculate a bounding box around a center point
///
/// Cheap rectangular pre-filter for the exact radius check. The longitude
/// half-width is the spherical-cap extent asin(sin(d) / cos(lat)), unbounded
/// when the circle reaches a pole.
pub fn calculate_bounding_box(center: GeoPoint, radius_miles: f64) -> BoundingBox {
    let angular = radius_miles * METERS_PER_MILE / EARTH_RADIUS_METERS;
    let lat_delta = angular.to_degrees();

    let ratio = angular.sin() / center.latitude.to_radians().cos();
    let lon_delta = if angular >= std::f64::consts::FRAC_PI_2 || !(ratio < 1.0) {
        f64::INFINITY
    } else {
        ratio.asin().to_degrees()
    };

    BoundingBox {
        min_lat: center.latitude - lat_delta,
        max_lat: center.latitude + lat_delta,
        min_lon: center.longitude - lon_delta,
        max_lon: center.longitude + lon_delta,
    }
}

/// True when the box crosses a pole or the antimeridian and so cannot be
/// used as a plain range filter
pub fn bounding_box_wraps(bbox: &BoundingBox) -> bool {
    bbox.min_lat < -90.0
        || bbox.max_lat > 90.0
        || bbox.min_lon < -180.0
        || bbox.max_lon > 180.0
        || !bbox.min_lon.is_finite()
        || !bbox.max_lon.is_finite()
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(point: GeoPoint, bbox: &BoundingBox) -> bool {
    point.latitude >= bbox.min_lat
        && point.latitude <= bbox.max_lat
        && point.longitude >= bbox.min_lon
        && point.longitude <= bbox.max_lon
}

/// Exact radius check
#[inline]
pub fn is_within_radius(center: GeoPoint, point: GeoPoint, radius_miles: f64) -> bool {
    distance_miles(center, point) <= radius_miles
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEW_YORK: GeoPoint = GeoPoint {
        longitude: -74.0060,
        latitude: 40.7128,
    };

    #[test]
    fn test_distance_london_paris() {
        // Approximately 213 miles
        let london = GeoPoint::new(-0.1278, 51.5074);
        let paris = GeoPoint::new(2.3522, 48.8566);

        let distance = distance_miles(london, paris);
        assert!((distance - 213.0).abs() < 5.0, "Distance should be ~213mi, got {}", distance);
    }

    #[test]
    fn test_distance_zero() {
        assert!(distance_miles(NEW_YORK, NEW_YORK) < 0.001);
    }

    #[test]
    fn test_bounding_box() {
        let bbox = calculate_bounding_box(NEW_YORK, 10.0);

        assert!(bbox.min_lat < NEW_YORK.latitude);
        assert!(bbox.max_lat > NEW_YORK.latitude);
        assert!(bbox.min_lon < NEW_YORK.longitude);
        assert!(bbox.max_lon > NEW_YORK.longitude);

        // 20 miles of arc = ~0.29 degrees of latitude
        let lat_span = bbox.max_lat - bbox.min_lat;
        assert!((lat_span - 0.29).abs() < 0.02, "Lat span should be ~0.29 degrees");
        assert!(!bounding_box_wraps(&bbox));
    }

    #[test]
    fn test_bounding_box_near_antimeridian_wraps() {
        let bbox = calculate_bounding_box(GeoPoint::new(179.9, 10.0), 50.0);
        assert!(bounding_box_wraps(&bbox));
    }

    #[test]
    fn test_bounding_box_covers_radius_at_high_latitude() {
        let center = GeoPoint::new(0.0, 70.0);
        let radius = 600.0;
        let bbox = calculate_bounding_box(center, radius);
        assert!(!bounding_box_wraps(&bbox));

        for lat_step in 0..=100 {
            for lon_step in 0..=200 {
                let point = GeoPoint::new(
                    -30.0 + f64::from(lon_step) * 0.3,
                    60.0 + f64::from(lat_step) * 0.2,
                );
                if distance_miles(center, point) <= radius {
                    assert!(
                        is_within_bounding_box(point, &bbox),
                        "{:?} is within {} miles but outside {:?}",
                        point,
                        radius,
                        bbox
                    );
                }
            }
        }
    }

    #[test]
    fn test_bounding_box_reaching_pole_wraps() {
        let bbox = calculate_bounding_box(GeoPoint::new(10.0, 85.0), 500.0);
        assert!(bounding_box_wraps(&bbox));
    }

    #[test]
    fn test_point_within_bbox() {
        let bbox = calculate_bounding_box(NEW_YORK, 10.0);

        assert!(is_within_bounding_box(NEW_YORK, &bbox));
        assert!(is_within_bounding_box(GeoPoint::new(-74.0, 40.71), &bbox));
        assert!(!is_within_bounding_box(GeoPoint::new(-80.0, 50.0), &bbox));
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(12.345), 12.3);
        assert_eq!(round_to_tenth(0.06), 0.1);
    }
}
