use serde::Serialize;

use crate::geo::{angular_difference, local_offset, GeoPoint};

use super::{AnchorObject, HeadingSample, ObjectProjection};

/// Settled sensor state: the last position and the last heading that passed
/// the debounce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    pub position: Option<GeoPoint>,
    pub heading: Option<f64>,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position samples are taken as-is; filtering is the location service's job.
    pub fn apply_location(&mut self, position: GeoPoint) {
        self.position = Some(position);
    }

    /// Accepts `sample` only when it moved more than `debounce_degrees` away
    /// from the last accepted heading. The first sample is always accepted.
    pub fn apply_heading(&mut self, sample: HeadingSample, debounce_degrees: f64) -> bool {
        let accept = match self.heading {
            None => true,
            Some(last) => angular_difference(sample.degrees(), last) > debounce_degrees,
        };
        if accept {
            self.heading = Some(sample.degrees());
        }
        accept
    }

    pub fn has_fix(&self) -> bool {
        self.position.is_some()
    }

    /// Project every non-collected anchor into the user's local frame.
    ///
    /// No position yet means nothing is visible. Without a heading the frame is
    /// north-up and nothing counts as facing.
    pub fn project(&self, objects: &[AnchorObject], facing_threshold_degrees: f64) -> Vec<ObjectProjection> {
        let Some(position) = self.position else {
            return Vec::new();
        };
        let heading = self.heading.unwrap_or(0.0);

        objects
            .iter()
            .filter(|object| !object.collected)
            .map(|object| {
                let offset = local_offset(position, heading, object.position);
                let facing = self
                    .heading
                    .map(|h| angular_difference(h, offset.bearing_degrees) <= facing_threshold_degrees)
                    .unwrap_or(false);

                ObjectProjection {
                    anchor_id: object.id,
                    distance_meters: offset.distance_meters,
                    local_x: offset.x,
                    local_z: offset.z,
                    bearing_degrees: offset.bearing_degrees,
                    facing,
                    in_range: offset.distance_meters <= object.collect_radius_meters,
                    within_tangent_range: offset.within_tangent_range,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS_METERS;

    const DEBOUNCE: f64 = 2.0;
    const FACING: f64 = 30.0;

    fn heading(deg: f64) -> HeadingSample {
        HeadingSample::new(deg).unwrap()
    }

    fn north_of(origin: GeoPoint, meters: f64) -> GeoPoint {
        let deg = meters / (EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0);
        GeoPoint::new(origin.latitude + deg, origin.longitude)
    }

    fn origin() -> GeoPoint {
        GeoPoint::new(14.8133, 121.03685)
    }

    #[test]
    fn first_heading_is_accepted() {
        let mut state = TrackerState::new();
        assert!(state.apply_heading(heading(100.0), DEBOUNCE));
        assert_eq!(state.heading, Some(100.0));
    }

    #[test]
    fn small_deltas_never_move_the_heading() {
        let mut state = TrackerState::new();
        state.apply_heading(heading(100.0), DEBOUNCE);

        for deg in [101.0, 102.0, 99.0, 98.5, 100.5, 101.9] {
            assert!(!state.apply_heading(heading(deg), DEBOUNCE));
            assert_eq!(state.heading, Some(100.0));
        }
    }

    #[test]
    fn large_delta_updates_exactly_once() {
        let mut state = TrackerState::new();
        state.apply_heading(heading(100.0), DEBOUNCE);

        assert!(state.apply_heading(heading(105.0), DEBOUNCE));
        assert_eq!(state.heading, Some(105.0));
        assert!(!state.apply_heading(heading(105.0), DEBOUNCE));
        assert_eq!(state.heading, Some(105.0));
    }

    #[test]
    fn debounce_compares_across_north() {
        let mut state = TrackerState::new();
        state.apply_heading(heading(359.5), DEBOUNCE);

        // 1.0 is only 1.5 degrees away from 359.5
        assert!(!state.apply_heading(heading(1.0), DEBOUNCE));
        assert_eq!(state.heading, Some(359.5));

        assert!(state.apply_heading(heading(3.0), DEBOUNCE));
        assert_eq!(state.heading, Some(3.0));
    }

    #[test]
    fn no_fix_projects_nothing() {
        let mut state = TrackerState::new();
        state.apply_heading(heading(0.0), DEBOUNCE);
        let anchors = vec![AnchorObject::new(1, "A", origin(), 10.0)];
        assert!(state.project(&anchors, FACING).is_empty());
    }

    #[test]
    fn collected_anchors_are_skipped() {
        let mut state = TrackerState::new();
        state.apply_location(origin());
        let mut collected = AnchorObject::new(1, "A", north_of(origin(), 5.0), 10.0);
        collected.collected = true;
        let open = AnchorObject::new(2, "B", north_of(origin(), 8.0), 10.0);

        let projections = state.project(&[collected, open], FACING);
        assert_eq!(projections.len(), 1);
        assert_eq!(projections[0].anchor_id, 2);
    }

    #[test]
    fn facing_and_range_flags() {
        let mut state = TrackerState::new();
        state.apply_location(origin());
        state.apply_heading(heading(20.0), DEBOUNCE);

        let anchors = vec![
            AnchorObject::new(1, "near-ahead", north_of(origin(), 5.0), 10.0),
            AnchorObject::new(2, "far-ahead", north_of(origin(), 50.0), 10.0),
        ];
        let projections = state.project(&anchors, FACING);

        assert!(projections[0].facing);
        assert!(projections[0].in_range);
        assert!(projections[1].facing);
        assert!(!projections[1].in_range);

        state.apply_heading(heading(180.0), DEBOUNCE);
        let turned = state.project(&anchors, FACING);
        assert!(!turned[0].facing);
        assert!(turned[0].local_z > 0.0);
    }

    #[test]
    fn missing_heading_never_faces() {
        let mut state = TrackerState::new();
        state.apply_location(origin());
        let anchors = vec![AnchorObject::new(1, "A", north_of(origin(), 5.0), 10.0)];

        let projections = state.project(&anchors, FACING);
        assert!(!projections[0].facing);
        assert!(projections[0].in_range);
        assert!(projections[0].local_z < 0.0);
    }

    #[test]
    fn project_is_idempotent() {
        let mut state = TrackerState::new();
        state.apply_location(origin());
        state.apply_heading(heading(45.0), DEBOUNCE);
        let anchors = vec![AnchorObject::new(1, "A", north_of(origin(), 30.0), 10.0)];

        let first = state.project(&anchors, FACING);
        let second = state.project(&anchors, FACING);
        assert_eq!(first, second);
        for p in &first {
            assert!((0.0..360.0).contains(&p.bearing_degrees));
        }
    }
}
