use serde::{Deserialize, Serialize};

/// A geographic position in degrees, as reported by the vehicle link.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_nan(&self) -> bool {
        self.latitude.is_nan() || self.longitude.is_nan()
    }
}

/// A target point the vehicle must visit, in the order it was added.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude relative to take-off, in meters
    pub altitude: f32,
}

impl Waypoint {
    pub const fn new(latitude: f64, longitude: f64, altitude: f32) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    pub const fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

/// Opaque handle to something drawn on the map surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerHandle(pub u64);
