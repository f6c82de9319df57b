use std::cmp::Ordering;

use crate::tracking::ObjectProjection;

/// Render culling. Independent of whether an anchor can be collected.
pub fn visible(projections: &[ObjectProjection], max_render_distance_meters: f64) -> Vec<ObjectProjection> {
    projections
        .iter()
        .filter(|p| p.distance_meters <= max_render_distance_meters)
        .copied()
        .collect()
}

/// Nearest anchor that is both in range and faced. Ties go to the lowest id.
pub fn active_target(projections: &[ObjectProjection]) -> Option<ObjectProjection> {
    projections
        .iter()
        .filter(|p| p.in_range && p.facing)
        .min_by(|a, b| compare_nearest(a, b))
        .copied()
}

/// Distance to the closest anchor, for the "nearest object" hint.
pub fn nearest_distance(projections: &[ObjectProjection]) -> Option<f64> {
    projections
        .iter()
        .map(|p| p.distance_meters)
        .min_by(|a, b| a.total_cmp(b))
}

fn compare_nearest(a: &ObjectProjection, b: &ObjectProjection) -> Ordering {
    a.distance_meters
        .total_cmp(&b.distance_meters)
        .then(a.anchor_id.cmp(&b.anchor_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection(anchor_id: u64, distance: f64, facing: bool, in_range: bool) -> ObjectProjection {
        ObjectProjection {
            anchor_id,
            distance_meters: distance,
            local_x: 0.0,
            local_z: -distance,
            bearing_degrees: 0.0,
            facing,
            in_range,
            within_tangent_range: true,
        }
    }

    #[test]
    fn visible_culls_by_distance() {
        let all = vec![
            projection(1, 5.0, true, true),
            projection(2, 100.0, true, false),
            projection(3, 100.5, true, false),
        ];
        let ids: Vec<_> = visible(&all, 100.0).iter().map(|p| p.anchor_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn active_target_requires_range_and_facing() {
        let all = vec![
            projection(1, 3.0, false, true),
            projection(2, 4.0, true, false),
            projection(3, 8.0, true, true),
        ];
        assert_eq!(active_target(&all).map(|p| p.anchor_id), Some(3));
    }

    #[test]
    fn active_target_prefers_nearest_then_lowest_id() {
        let all = vec![
            projection(7, 6.0, true, true),
            projection(4, 6.0, true, true),
            projection(9, 9.0, true, true),
        ];
        assert_eq!(active_target(&all).map(|p| p.anchor_id), Some(4));
    }

    #[test]
    fn no_candidates_means_no_target() {
        assert!(active_target(&[]).is_none());
        assert!(active_target(&[projection(1, 2.0, false, false)]).is_none());
    }

    #[test]
    fn nearest_distance_ignores_eligibility() {
        let all = vec![projection(1, 40.0, false, false), projection(2, 12.5, false, false)];
        assert_eq!(nearest_distance(&all), Some(12.5));
        assert_eq!(nearest_distance(&[]), None);
    }
}
