/// Valid latitudes lie strictly within this bound [deg]
pub const MAX_LATITUDE: f64 = 90.0;

/// Valid longitudes lie strictly within this bound [deg]
pub const MAX_LONGITUDE: f64 = 180.0;

/// Altitude assigned to every waypoint when nothing else is configured [m]
pub const DEFAULT_ALTITUDE: f32 = 100.0;

/// Flight speed used when nothing else is configured [m/s]
pub const DEFAULT_SPEED: f32 = 10.0;

/// Map zoom level used when recentering on the vehicle
pub const DEFAULT_CAMERA_ZOOM: f64 = 18.0;

/// Number of automatic retries after a failed mission upload
pub const DEFAULT_UPLOAD_RETRIES: u8 = 1;
