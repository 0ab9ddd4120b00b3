//! Telemetry tracker
//!
//! Receives position fixes pushed by the vehicle link, on whatever thread
//! the link delivers them, and turns them into render instructions for the
//! vehicle marker and the map camera.

use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::watch::Watch;

use crate::gateway::TelemetrySource;
use crate::geo;
use crate::presentation::{PresentationPort, RenderInstruction};
use crate::types::waypoint::Position;
use crate::M;

/// Maximum number of concurrent receivers of the position watch
pub const POSITION_RECEIVERS: usize = 4;

pub type PositionWatch = Watch<M, Position, POSITION_RECEIVERS>;

/// What became of a single fix
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// A coordinate was NaN, the fix was discarded entirely
    Dropped,
    /// The fix was cached, but is not a usable position to render
    Cached,
    /// The fix was cached and the vehicle marker moved to it
    Rendered,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FixCounters {
    pub dropped: u32,
    pub cached: u32,
    pub rendered: u32,
}

struct State {
    last: Option<Position>,
    counters: FixCounters,
}

pub struct TelemetryTracker {
    name: &'static str,
    state: Mutex<M, RefCell<State>>,
    position: PositionWatch,
    port: Arc<PresentationPort>,
    zoom: f64,
}

impl TelemetryTracker {
    pub fn new(port: Arc<PresentationPort>, zoom: f64) -> Self {
        Self {
            name: "telemetry",
            state: Mutex::new(RefCell::new(State {
                last: None,
                counters: FixCounters::default(),
            })),
            position: PositionWatch::new(),
            port,
            zoom,
        }
    }

    /// Route every fix of the source into this tracker.
    pub fn attach(self: &Arc<Self>, source: &mut impl TelemetrySource) {
        let tracker = Arc::clone(self);
        source.set_position_callback(Box::new(move |latitude, longitude| {
            tracker.on_fix(latitude, longitude);
        }));
        debug!("[{}] Attached to telemetry source", self.name);
    }

    /// Handle one fix. Safe to call from any thread.
    ///
    /// NaN fixes are dropped without a trace. Anything else replaces the
    /// last known position, but only valid positions are rendered.
    pub fn on_fix(&self, latitude: f64, longitude: f64) -> FixOutcome {
        let position = Position::new(latitude, longitude);
        if position.is_nan() {
            self.state
                .lock(|state| state.borrow_mut().counters.dropped += 1);
            return FixOutcome::Dropped;
        }

        // Publishing under the lock keeps render order equal to arrival order
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.last = Some(position);
            self.position.sender().send(position);

            if geo::is_valid(latitude, longitude) {
                state.counters.rendered += 1;
                self.port.post(RenderInstruction::TrackVehicle {
                    position,
                    zoom: self.zoom,
                });
                FixOutcome::Rendered
            } else {
                state.counters.cached += 1;
                FixOutcome::Cached
            }
        })
    }

    /// Center the map on the last known position again.
    ///
    /// Returns `false` if no valid position is known.
    pub fn locate(&self) -> bool {
        match self.last_position() {
            Some(position) if geo::is_valid(position.latitude, position.longitude) => {
                self.port.post(RenderInstruction::TrackVehicle {
                    position,
                    zoom: self.zoom,
                });
                true
            }
            _ => {
                warn!("[{}] No valid vehicle position to locate", self.name);
                false
            }
        }
    }

    pub fn last_position(&self) -> Option<Position> {
        self.state.lock(|state| state.borrow().last)
    }

    /// Latest-value signal of the cached position
    pub fn position_watch(&self) -> &PositionWatch {
        &self.position
    }

    pub fn counters(&self) -> FixCounters {
        self.state.lock(|state| state.borrow().counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;

    fn tracker() -> (Arc<TelemetryTracker>, Arc<PresentationPort>) {
        let port = Arc::new(PresentationPort::new());
        (Arc::new(TelemetryTracker::new(port.clone(), 18.0)), port)
    }

    fn track(lat: f64, lon: f64) -> RenderInstruction {
        RenderInstruction::TrackVehicle {
            position: Position::new(lat, lon),
            zoom: 18.0,
        }
    }

    #[test]
    fn nan_fix_is_dropped() {
        let (tracker, port) = tracker();

        assert_eq!(tracker.on_fix(10.0, 20.0), FixOutcome::Rendered);
        assert_eq!(tracker.on_fix(f64::NAN, 20.0), FixOutcome::Dropped);

        assert_eq!(tracker.last_position(), Some(Position::new(10.0, 20.0)));
        assert_eq!(port.drain(), vec![track(10.0, 20.0)]);
        assert_eq!(tracker.counters().dropped, 1);
    }

    #[test]
    fn invalid_fix_is_cached_but_not_rendered() {
        let (tracker, port) = tracker();

        assert_eq!(tracker.on_fix(0.0, 0.0), FixOutcome::Cached);
        assert_eq!(tracker.on_fix(95.0, 20.0), FixOutcome::Cached);

        assert_eq!(tracker.last_position(), Some(Position::new(95.0, 20.0)));
        assert_eq!(
            tracker.position_watch().try_get(),
            Some(Position::new(95.0, 20.0))
        );
        assert!(port.drain().is_empty());
        assert!(!tracker.locate());
    }

    #[test]
    fn locate_recenters_on_last_valid_fix() {
        let (tracker, port) = tracker();
        assert!(!tracker.locate());

        tracker.on_fix(10.0, 20.0);
        port.drain();

        assert!(tracker.locate());
        assert_eq!(port.drain(), vec![track(10.0, 20.0)]);
    }

    #[test]
    fn attached_source_feeds_tracker() {
        let (tracker, port) = tracker();
        let mut source = MockGateway::new();
        assert!(!source.push_fix(1.0, 1.0));

        tracker.attach(&mut source);
        assert!(source.push_fix(10.0, 20.0));
        assert!(source.push_fix(f64::NAN, f64::NAN));

        assert_eq!(port.drain(), vec![track(10.0, 20.0)]);
        assert_eq!(
            tracker.counters(),
            FixCounters {
                dropped: 1,
                cached: 0,
                rendered: 1
            }
        );
    }

    #[test]
    fn undrained_fixes_leave_one_position() {
        let (tracker, port) = tracker();

        for i in 0..1000 {
            tracker.on_fix(10.0, 20.0 + i as f64 * 0.001);
        }

        assert_eq!(port.pending(), 1);
        assert_eq!(port.drain(), vec![track(10.0, 20.0 + 999.0 * 0.001)]);
        assert_eq!(tracker.counters().rendered, 1000);
    }

    #[test]
    fn concurrent_fixes_leave_the_newest_position() {
        let (tracker, port) = tracker();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for i in 1..=50 {
                        tracker.on_fix(t as f64 + 1.0, i as f64);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let rendered = port.drain();
        assert_eq!(rendered.len(), 1);
        let last = tracker.last_position().unwrap();
        assert_eq!(last.longitude, 50.0);
        assert_eq!(
            rendered,
            vec![RenderInstruction::TrackVehicle {
                position: last,
                zoom: 18.0
            }]
        );
        assert_eq!(tracker.counters().rendered, 200);
    }
}
