pub mod mission;
pub mod phase;
pub mod waypoint;
