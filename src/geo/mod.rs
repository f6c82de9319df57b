pub mod geodesy;

pub use geodesy::{
    angular_difference, distance_meters, initial_bearing_degrees, local_offset,
    normalize_degrees, GeoPoint, LocalOffset, EARTH_RADIUS_METERS, TANGENT_PLANE_LIMIT_METERS,
};
