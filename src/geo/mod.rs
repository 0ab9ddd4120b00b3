use crate::consts::{MAX_LATITUDE, MAX_LONGITUDE};

/// Whether a live position fix is usable for placing the vehicle on the map.
///
/// Both coordinates must lie strictly within their ranges, and the exact
/// `(0, 0)` position is rejected since that is what the vehicle link reports
/// before it has a fix. `NaN` fails every comparison and is rejected too.
pub fn is_valid(latitude: f64, longitude: f64) -> bool {
    in_range(latitude, longitude) && !(latitude == 0.0 && longitude == 0.0)
}

/// Whether a user-authored waypoint has usable coordinates.
///
/// Unlike [`is_valid`] this accepts `(0, 0)`, which is a real place
/// even if nobody is likely to fly there.
pub fn is_valid_waypoint(latitude: f64, longitude: f64) -> bool {
    in_range(latitude, longitude)
}

fn in_range(latitude: f64, longitude: f64) -> bool {
    latitude > -MAX_LATITUDE
        && latitude < MAX_LATITUDE
        && longitude > -MAX_LONGITUDE
        && longitude < MAX_LONGITUDE
}
