use core::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_ALTITUDE, DEFAULT_SPEED};

use super::waypoint::Waypoint;

/// What the vehicle does once the last waypoint is reached.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishedAction {
    /// Hover at the last waypoint
    #[default]
    NoAction,
    /// Return to the home point
    GoHome,
    /// Land at the last waypoint
    AutoLand,
    /// Fly back to the first waypoint
    GoFirstWaypoint,
}

/// How the vehicle points its nose while flying the mission.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingMode {
    /// Point towards the next waypoint
    #[default]
    Auto,
    /// Keep the heading the vehicle had when the mission started
    UsingInitialDirection,
    /// The operator controls the heading with the remote controller
    ControlledByOperator,
    /// Use the heading stored with each waypoint
    UsingWaypointHeading,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightPathMode {
    /// Straight lines between waypoints
    #[default]
    Normal,
}

/// Mission-wide flight configuration, frozen into every [`MissionDefinition`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionConfig {
    pub finished_action: FinishedAction,
    pub heading_mode: HeadingMode,
    /// Cruise speed while executing the mission [m/s]
    pub auto_flight_speed: f32,
    /// Upper limit on the speed the operator can command [m/s]
    pub max_flight_speed: f32,
    pub path_mode: FlightPathMode,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            finished_action: FinishedAction::default(),
            heading_mode: HeadingMode::default(),
            auto_flight_speed: DEFAULT_SPEED,
            max_flight_speed: DEFAULT_SPEED,
            path_mode: FlightPathMode::default(),
        }
    }
}

/// The three speeds offered to the user when configuring a mission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedPreset {
    Low,
    Mid,
    High,
}

impl SpeedPreset {
    pub const fn speed(self) -> f32 {
        match self {
            SpeedPreset::Low => 3.0,
            SpeedPreset::Mid => 5.0,
            SpeedPreset::High => 10.0,
        }
    }
}

/// The settings a user picks in one go before a mission is frozen.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionSettings {
    /// Altitude written to every waypoint [m]
    pub altitude: f32,
    /// Used for both the auto and max flight speed [m/s]
    pub speed: f32,
    pub finished_action: FinishedAction,
    pub heading_mode: HeadingMode,
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            altitude: DEFAULT_ALTITUDE,
            speed: DEFAULT_SPEED,
            finished_action: FinishedAction::default(),
            heading_mode: HeadingMode::default(),
        }
    }
}

impl MissionSettings {
    /// Parse an altitude typed by the user. Spaces are ignored, and
    /// anything that is not a whole number gives an altitude of zero.
    pub fn parse_altitude(text: &str) -> f32 {
        let compact: String = text.chars().filter(|c| *c != ' ').collect();
        compact.parse::<i32>().unwrap_or(0) as f32
    }

    pub fn with_speed_preset(mut self, preset: SpeedPreset) -> Self {
        self.speed = preset.speed();
        self
    }
}

/// Identity of a frozen mission. Every freeze produces a new one, which is
/// what lets late gateway callbacks be matched to the mission they belong to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissionId(pub u32);

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An immutable snapshot of waypoints and configuration, ready to be
/// loaded onto the vehicle. Superseded by the next freeze, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionDefinition {
    id: MissionId,
    waypoints: Vec<Waypoint>,
    config: MissionConfig,
}

impl MissionDefinition {
    pub(crate) fn new(id: MissionId, waypoints: Vec<Waypoint>, config: MissionConfig) -> Self {
        Self {
            id,
            waypoints,
            config,
        }
    }

    pub fn id(&self) -> MissionId {
        self.id
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn altitude_parsing_falls_back_to_zero() {
        assert_eq!(MissionSettings::parse_altitude("120"), 120.0);
        assert_eq!(MissionSettings::parse_altitude(" 1 5 "), 15.0);
        assert_eq!(MissionSettings::parse_altitude("-20"), -20.0);
        assert_eq!(MissionSettings::parse_altitude("12.5"), 0.0);
        assert_eq!(MissionSettings::parse_altitude(""), 0.0);
        assert_eq!(MissionSettings::parse_altitude("high"), 0.0);
    }

    #[test]
    fn speed_presets() {
        let settings = MissionSettings::default().with_speed_preset(SpeedPreset::Mid);
        assert_eq!(settings.speed, 5.0);
        assert_eq!(SpeedPreset::Low.speed(), 3.0);
        assert_eq!(SpeedPreset::High.speed(), 10.0);
    }
}
