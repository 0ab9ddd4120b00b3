use core::cell::RefCell;
use std::collections::BTreeMap;

use embassy_sync::blocking_mutex::Mutex;

use crate::errors::ValidationError;
use crate::geo;
use crate::types::waypoint::{MarkerHandle, Waypoint};
use crate::M;

/// Ordered collection of the waypoints the user has placed, together with
/// the map markers drawn for them.
///
/// Shared between the presentation thread and gateway threads, so every
/// operation takes the internal lock exactly once. Two concurrent calls to
/// [`WaypointRegistry::add_waypoint`] therefore always get distinct indexes.
pub struct WaypointRegistry {
    state: Mutex<M, RefCell<State>>,
}

#[derive(Default)]
struct State {
    waypoints: Vec<Waypoint>,
    markers: BTreeMap<usize, MarkerHandle>,
}

impl Default for WaypointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WaypointRegistry {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                waypoints: Vec::new(),
                markers: BTreeMap::new(),
            })),
        }
    }

    /// Append a waypoint and return its index in the mission order.
    pub fn add_waypoint(&self, waypoint: Waypoint) -> usize {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let index = state.waypoints.len();
            state.waypoints.push(waypoint);
            index
        })
    }

    /// Forget every waypoint and every marker handle.
    pub fn clear(&self) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.waypoints.clear();
            state.markers.clear();
        })
    }

    /// Forget the marker handles only, after the map surface was cleared.
    pub fn clear_markers(&self) {
        self.state
            .lock(|state| state.borrow_mut().markers.clear())
    }

    /// Overwrite the altitude of every stored waypoint.
    pub fn set_altitude_all(&self, altitude: f32) {
        self.state.lock(|state| {
            state
                .borrow_mut()
                .waypoints
                .iter_mut()
                .for_each(|wp| wp.altitude = altitude)
        })
    }

    /// Check every waypoint, overwrite its altitude and return a copy of
    /// them in insertion order, all under one lock. Concurrent adds land
    /// either entirely before or entirely after this.
    ///
    /// Nothing is touched if a waypoint has unusable coordinates.
    pub fn freeze_at_altitude(&self, altitude: f32) -> Result<Vec<Waypoint>, ValidationError> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.waypoints.is_empty() {
                return Err(ValidationError::EmptyMission);
            }

            if let Some((index, wp)) = state
                .waypoints
                .iter()
                .enumerate()
                .find(|(_, wp)| !geo::is_valid_waypoint(wp.latitude, wp.longitude))
            {
                return Err(ValidationError::InvalidWaypoint {
                    index,
                    latitude: wp.latitude,
                    longitude: wp.longitude,
                });
            }

            state
                .waypoints
                .iter_mut()
                .for_each(|wp| wp.altitude = altitude);
            Ok(state.waypoints.clone())
        })
    }

    /// Copy of the waypoints in insertion order.
    pub fn snapshot(&self) -> Vec<Waypoint> {
        self.state.lock(|state| state.borrow().waypoints.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock(|state| state.borrow().waypoints.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Waypoint> {
        self.state
            .lock(|state| state.borrow().waypoints.get(index).copied())
    }

    /// Associate a drawn marker with the waypoint at `index`.
    ///
    /// Returns `false` if the waypoint no longer exists, in which case the
    /// caller owns the stray marker.
    pub fn register_marker(&self, index: usize, marker: MarkerHandle) -> bool {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if index >= state.waypoints.len() {
                return false;
            }
            state.markers.insert(index, marker);
            true
        })
    }

    pub fn marker_for(&self, index: usize) -> Option<MarkerHandle> {
        self.state
            .lock(|state| state.borrow().markers.get(&index).copied())
    }

    pub fn marker_count(&self) -> usize {
        self.state.lock(|state| state.borrow().markers.len())
    }
}
