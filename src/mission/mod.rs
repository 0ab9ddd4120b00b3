//! Mission authoring
//!
//! Waypoints are collected in the [`WaypointRegistry`] while the user edits
//! the map, and turned into an immutable
//! [`MissionDefinition`](crate::types::mission::MissionDefinition) by the
//! [`MissionBuilder`] once the user has picked the mission settings.

pub mod builder;
pub mod registry;

pub use builder::MissionBuilder;
pub use registry::WaypointRegistry;
