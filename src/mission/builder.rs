use crate::errors::ValidationError;
use crate::types::mission::{FlightPathMode, MissionConfig, MissionDefinition, MissionId, MissionSettings};

use super::WaypointRegistry;

/// Draft of the mission-wide configuration, edited until the mission
/// is frozen into a [`MissionDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub struct MissionBuilder {
    config: MissionConfig,
    altitude: f32,
}

impl Default for MissionBuilder {
    fn default() -> Self {
        Self::new(MissionSettings::default())
    }
}

impl MissionBuilder {
    pub fn new(settings: MissionSettings) -> Self {
        let mut builder = Self {
            config: MissionConfig::default(),
            altitude: settings.altitude,
        };
        builder.apply(settings);
        builder
    }

    /// Take over the settings picked by the user. The single speed value is
    /// used for both the auto and the max flight speed.
    pub fn apply(&mut self, settings: MissionSettings) {
        self.altitude = settings.altitude;
        self.config = MissionConfig {
            finished_action: settings.finished_action,
            heading_mode: settings.heading_mode,
            auto_flight_speed: settings.speed,
            max_flight_speed: settings.speed,
            path_mode: FlightPathMode::Normal,
        };
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn altitude(&self) -> f32 {
        self.altitude
    }

    /// Check the registry contents and freeze them, together with the
    /// current draft, into a new mission definition.
    ///
    /// The draft altitude is written back to every waypoint in the registry
    /// in the same step as the copy is taken, so a waypoint added meanwhile
    /// is either frozen with it or left for the next mission. Nothing is
    /// touched if validation fails.
    pub fn freeze(
        &self,
        registry: &WaypointRegistry,
        id: MissionId,
    ) -> Result<MissionDefinition, ValidationError> {
        if !self.altitude.is_finite() {
            return Err(ValidationError::InvalidAltitude);
        }

        let waypoints = registry.freeze_at_altitude(self.altitude)?;

        Ok(MissionDefinition::new(id, waypoints, self.config))
    }
}
