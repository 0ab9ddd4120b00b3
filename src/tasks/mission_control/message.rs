use crate::errors::MissionError;
use crate::types::mission::MissionSettings;
use crate::types::waypoint::Waypoint;

/// The command to be sent to the [`MissionControl`](super::MissionControl)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Append a waypoint to the registry. Only accepted in edit mode.
    AddWaypoint(Waypoint),

    /// Remove every waypoint and every marker. Does not cancel a
    /// mission that is being uploaded or flown.
    ClearWaypoints,

    /// Freeze the registry with these settings and load the result into
    /// the gateway, superseding any previously loaded mission
    Configure(MissionSettings),

    /// Transfer the loaded mission to the vehicle
    Upload,

    /// Ask the vehicle to start flying the uploaded mission.
    ///
    /// The phase only changes once the vehicle reports that execution
    /// has started.
    Start,

    /// Ask the vehicle to stop flying the mission
    Stop,

    /// Flip whether waypoints can be added
    ToggleEditMode,
}

impl From<Waypoint> for Command {
    fn from(value: Waypoint) -> Self {
        Command::AddWaypoint(value)
    }
}

impl From<MissionSettings> for Command {
    fn from(value: MissionSettings) -> Self {
        Command::Configure(value)
    }
}

/// The response to a command to the [`MissionControl`](super::MissionControl)
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The command was accepted and processed appropriately
    Accepted,

    /// The waypoint was added with this index
    Added(usize),

    /// Edit mode is now on or off
    EditMode(bool),

    /// The command would have no effect on the system
    Unchanged,

    /// The command was rejected, or the gateway refused it outright
    Rejected(MissionError),
}

impl Response {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Response::Rejected(_))
    }
}
