/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance between two profiles' resolved coordinates, when both resolve.
/// Geocoding of free-text locations is external; absent coordinates mean the
/// distance dimension is unconstrained.
pub fn pair_distance_km(
    a: Option<(f64, f64)>,
    b: Option<(f64, f64)>,
) -> Option<f64> {
    match (a, b) {
        (Some((lat1, lon1)), Some((lat2, lon2))) => {
            Some(haversine_distance(lat1, lon1, lat2, lon2))
        }
        _ => None,
    }
}
