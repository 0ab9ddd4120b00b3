use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::phase::PhaseKind;

/// Every failure the mission core can report. None of these are fatal,
/// they are either folded into a phase value or returned as a rejection.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MissionError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Precondition error: {0}")]
    Precondition(#[from] PreconditionError),
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Waypoint {index} has invalid coordinates ({latitude}, {longitude}).")]
    InvalidWaypoint {
        index: usize,
        latitude: f64,
        longitude: f64,
    },
    #[error("The mission has no waypoints.")]
    EmptyMission,
    #[error("The mission altitude is not a finite number.")]
    InvalidAltitude,
}

/// A failure reported by the mission control gateway. The description is
/// kept verbatim, since that is what the user gets to see.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{description}")]
pub struct GatewayError {
    pub description: String,
}

impl GatewayError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreconditionError {
    #[error("Waypoints can only be added in edit mode.")]
    NotEditing,
    #[error("No mission is currently loaded.")]
    NoMissionLoaded,
    #[error("No valid vehicle position is known.")]
    NoVehicleFix,
    #[error("The command is not supported while {0:?}.")]
    Busy(PhaseKind),
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("Failed to serialize the configuration.")]
    Serialize,
    #[error("Stored configuration could not be deserialized.")]
    Deserialize,
}

impl From<postcard::Error> for ConfigError {
    fn from(value: postcard::Error) -> Self {
        match value {
            postcard::Error::SerializeBufferFull
            | postcard::Error::SerializeSeqLengthUnknown
            | postcard::Error::SerdeSerCustom => ConfigError::Serialize,
            _ => ConfigError::Deserialize,
        }
    }
}
