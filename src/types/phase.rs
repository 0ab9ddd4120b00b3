use serde::{Deserialize, Serialize};

use crate::errors::MissionError;

/// How an asynchronous stage of the mission ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Ok,
    Failed(MissionError),
}

impl Outcome {
    pub fn from_result(result: Result<(), impl Into<MissionError>>) -> Self {
        match result {
            Ok(()) => Outcome::Ok,
            Err(error) => Outcome::Failed(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    pub fn error(&self) -> Option<&MissionError> {
        match self {
            Outcome::Ok => None,
            Outcome::Failed(error) => Some(error),
        }
    }
}

/// The current stage of the mission lifecycle.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub enum MissionPhase {
    /// Waypoints are being placed, nothing has been frozen
    #[default]
    Editing,
    /// A mission was frozen and is being handed to the gateway
    Configured,
    /// The gateway accepted or rejected the frozen mission
    Loaded(Outcome),
    /// The mission is being transferred to the vehicle
    Uploading,
    /// The transfer to the vehicle ended
    Uploaded(Outcome),
    /// The vehicle is flying the mission
    Executing,
    /// The vehicle reported the mission as finished
    Finished(Outcome),
    /// The mission ended after the operator stopped it
    Stopped,
}

impl MissionPhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            MissionPhase::Editing => PhaseKind::Editing,
            MissionPhase::Configured => PhaseKind::Configured,
            MissionPhase::Loaded(_) => PhaseKind::Loaded,
            MissionPhase::Uploading => PhaseKind::Uploading,
            MissionPhase::Uploaded(_) => PhaseKind::Uploaded,
            MissionPhase::Executing => PhaseKind::Executing,
            MissionPhase::Finished(_) => PhaseKind::Finished,
            MissionPhase::Stopped => PhaseKind::Stopped,
        }
    }

    /// Whether the mission of this phase is done for, either by failing
    /// or by having been flown. A new waypoint discards such a mission.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MissionPhase::Loaded(Outcome::Failed(_))
                | MissionPhase::Uploaded(Outcome::Failed(_))
                | MissionPhase::Finished(_)
                | MissionPhase::Stopped
        )
    }

    /// Whether a gateway operation for the active mission is outstanding
    /// or the vehicle is flying it.
    pub fn is_busy(&self) -> bool {
        matches!(self, MissionPhase::Uploading | MissionPhase::Executing)
    }
}

/// [`MissionPhase`] without its payload, for reporting and matching.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseKind {
    Editing,
    Configured,
    Loaded,
    Uploading,
    Uploaded,
    Executing,
    Finished,
    Stopped,
}
