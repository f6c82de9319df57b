use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine distance.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Separation beyond which the flat tangent-plane projection in [`local_offset`]
/// is no longer trusted.
pub const TANGENT_PLANE_LIMIT_METERS: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Position of a target relative to an observer, in a heading-forward local frame.
///
/// `x` grows to the observer's right; negative `z` is straight ahead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalOffset {
    pub x: f64,
    pub z: f64,
    pub distance_meters: f64,
    pub bearing_degrees: f64,
    /// False once the separation exceeds [`TANGENT_PLANE_LIMIT_METERS`]; the
    /// offsets are still returned but are skewed by Earth curvature.
    pub within_tangent_range: bool,
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Minimal angle between two compass directions, in `[0, 180]`.
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let delta = (a - b).rem_euclid(360.0);
    delta.min(360.0 - delta)
}

/// Great-circle distance using the haversine formula.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

    EARTH_RADIUS_METERS * 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
}

/// Forward azimuth from `from` to `to`, clockwise from true north.
///
/// Coincident points have no direction; 0 is returned for them.
pub fn initial_bearing_degrees(from: GeoPoint, to: GeoPoint) -> f64 {
    if from == to {
        return 0.0;
    }

    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let d_lambda = (to.longitude - from.longitude).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Project `to` into the observer's local frame at `from`, rotated by `heading`.
///
/// This is a flat-earth approximation, good for the sub-kilometer ranges anchors
/// are placed at.
pub fn local_offset(from: GeoPoint, heading: f64, to: GeoPoint) -> LocalOffset {
    let distance = distance_meters(from, to);
    let bearing = initial_bearing_degrees(from, to);
    let relative = (bearing - heading).to_radians();

    LocalOffset {
        x: distance * relative.sin(),
        z: -distance * relative.cos(),
        distance_meters: distance,
        bearing_degrees: bearing,
        within_tangent_range: distance <= TANGENT_PLANE_LIMIT_METERS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Meters per degree of latitude on the haversine sphere.
    const METERS_PER_DEG_LAT: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

    fn barasoain() -> GeoPoint {
        GeoPoint::new(14.813330703468642, 121.03685068219062)
    }

    #[test]
    fn identity_distance_is_zero() {
        let p = barasoain();
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let a = GeoPoint::new(rng.gen_range(-89.0..89.0), rng.gen_range(-180.0..180.0));
            let b = GeoPoint::new(rng.gen_range(-89.0..89.0), rng.gen_range(-180.0..180.0));
            let ab = distance_meters(a, b);
            let ba = distance_meters(b, a);
            assert!((ab - ba).abs() <= 1e-6 * ab.max(1.0), "{ab} vs {ba}");
        }
    }

    #[test]
    fn one_degree_of_latitude() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0);
        assert!((distance_meters(a, b) - METERS_PER_DEG_LAT).abs() < 1e-6);
    }

    #[test]
    fn cardinal_bearings() {
        let origin = barasoain();
        let north = GeoPoint::new(origin.latitude + 0.001, origin.longitude);
        let south = GeoPoint::new(origin.latitude - 0.001, origin.longitude);
        let east = GeoPoint::new(origin.latitude, origin.longitude + 0.001);
        let west = GeoPoint::new(origin.latitude, origin.longitude - 0.001);

        assert!(initial_bearing_degrees(origin, north).abs() < 1e-9);
        assert!((initial_bearing_degrees(origin, south) - 180.0).abs() < 1e-9);
        assert!((initial_bearing_degrees(origin, east) - 90.0).abs() < 1e-3);
        assert!((initial_bearing_degrees(origin, west) - 270.0).abs() < 1e-3);
    }

    #[test]
    fn bearing_stays_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let a = GeoPoint::new(rng.gen_range(-89.0..89.0), rng.gen_range(-180.0..180.0));
            let b = GeoPoint::new(rng.gen_range(-89.0..89.0), rng.gen_range(-180.0..180.0));
            let bearing = initial_bearing_degrees(a, b);
            assert!((0.0..360.0).contains(&bearing), "bearing {bearing}");
        }
    }

    #[test]
    fn coincident_points_have_zero_bearing() {
        let p = barasoain();
        assert_eq!(initial_bearing_degrees(p, p), 0.0);
    }

    #[test]
    fn normalize_wraps_both_directions() {
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert_eq!(normalize_degrees(-1e-18), 0.0);
    }

    #[test]
    fn angular_difference_handles_wraparound() {
        assert!((angular_difference(359.0, 1.0) - 2.0).abs() < 1e-9);
        assert!((angular_difference(1.0, 359.0) - 2.0).abs() < 1e-9);
        assert!((angular_difference(90.0, 270.0) - 180.0).abs() < 1e-9);
        assert_eq!(angular_difference(42.0, 42.0), 0.0);
    }

    #[test]
    fn target_dead_ahead_has_negative_z() {
        let origin = barasoain();
        let ahead = GeoPoint::new(origin.latitude + 20.0 / METERS_PER_DEG_LAT, origin.longitude);

        let offset = local_offset(origin, 0.0, ahead);
        assert!(offset.x.abs() < 1e-6);
        assert!((offset.z + 20.0).abs() < 1e-6);
        assert!(offset.within_tangent_range);
    }

    #[test]
    fn heading_rotates_the_frame() {
        let origin = barasoain();
        let north = GeoPoint::new(origin.latitude + 20.0 / METERS_PER_DEG_LAT, origin.longitude);

        // Facing east, a target due north sits to the left.
        let offset = local_offset(origin, 90.0, north);
        assert!((offset.x + 20.0).abs() < 1e-6);
        assert!(offset.z.abs() < 1e-6);
    }

    #[test]
    fn far_targets_are_flagged() {
        let origin = barasoain();
        let far = GeoPoint::new(origin.latitude + 0.05, origin.longitude);
        assert!(!local_offset(origin, 0.0, far).within_tangent_range);
    }
}
