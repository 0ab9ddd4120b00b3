//! Presentation thread plumbing
//!
//! The core never touches the map directly. Everything that should become
//! visible is posted as a [`RenderInstruction`] to the [`PresentationPort`],
//! from whichever thread produced it, and applied in posting order by a
//! [`Presenter`] running on the presentation thread.

use core::fmt;
use std::sync::Arc;

use crate::errors::{GatewayError, MissionError};
use crate::mission::WaypointRegistry;
use crate::sync::channel::Channel;
use crate::types::waypoint::{MarkerHandle, Position, Waypoint};

/// What a marker drawn on the map stands for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    /// Waypoint with the given insertion index
    Waypoint(usize),
    /// The live position of the vehicle
    Vehicle,
}

/// The map widget the presentation layer draws on.
pub trait MapSurface {
    fn place_marker(&mut self, kind: MarkerKind, position: Position) -> MarkerHandle;
    fn remove_marker(&mut self, marker: MarkerHandle);
    fn clear_markers(&mut self);
    fn move_camera(&mut self, position: Position, zoom: f64);
    fn show_status(&mut self, text: &str);
}

/// Text shown to the user after an action or gateway event.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusMessage {
    CannotAddWaypoint,
    AltitudeApplied(f32),
    LoadSucceeded,
    LoadFailed(MissionError),
    UploadSucceeded,
    UploadFailed {
        error: GatewayError,
        retrying: bool,
    },
    StartResult(Option<GatewayError>),
    StopResult(Option<GatewayError>),
    ExecutionFinished(Option<GatewayError>),
    Rejected(MissionError),
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::CannotAddWaypoint => write!(f, "Cannot add waypoint"),
            StatusMessage::AltitudeApplied(altitude) => {
                write!(f, "Set waypoint altitude to {altitude} m")
            }
            StatusMessage::LoadSucceeded => write!(f, "Mission load succeeded"),
            StatusMessage::LoadFailed(error) => write!(f, "Mission load failed: {error}"),
            StatusMessage::UploadSucceeded => write!(f, "Mission upload succeeded"),
            StatusMessage::UploadFailed { error, retrying } => {
                write!(f, "Mission upload failed: {error}")?;
                if *retrying {
                    write!(f, ", retrying...")?;
                }
                Ok(())
            }
            StatusMessage::StartResult(None) => write!(f, "Mission start: success"),
            StatusMessage::StartResult(Some(error)) => write!(f, "Mission start failed: {error}"),
            StatusMessage::StopResult(None) => write!(f, "Mission stop: success"),
            StatusMessage::StopResult(Some(error)) => write!(f, "Mission stop failed: {error}"),
            StatusMessage::ExecutionFinished(None) => write!(f, "Execution finished: success"),
            StatusMessage::ExecutionFinished(Some(error)) => {
                write!(f, "Execution finished: {error}")
            }
            StatusMessage::Rejected(error) => write!(f, "{error}"),
        }
    }
}

/// A single change to apply to the map surface.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderInstruction {
    /// Draw the marker of a newly added waypoint
    PlaceWaypointMarker { index: usize, waypoint: Waypoint },
    /// Replace the vehicle marker and center the camera on it
    TrackVehicle { position: Position, zoom: f64 },
    /// Remove every marker, the vehicle marker included
    ClearMarkers,
    Status(StatusMessage),
}

/// Ordered queue of render instructions, written from any thread and
/// read by the presentation thread.
///
/// Vehicle positions can arrive much faster than the map is redrawn, so a
/// position posted right behind another one still waiting replaces it.
#[derive(Default)]
pub struct PresentationPort {
    queue: Channel<RenderInstruction>,
}

impl PresentationPort {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
        }
    }

    pub fn post(&self, instruction: RenderInstruction) {
        match instruction {
            RenderInstruction::TrackVehicle { .. } => self.queue.send_or_replace_last(
                instruction,
                |last| matches!(last, RenderInstruction::TrackVehicle { .. }),
            ),
            _ => self.queue.send(instruction),
        }
    }

    pub fn status(&self, message: StatusMessage) {
        self.post(RenderInstruction::Status(message))
    }

    pub fn try_next(&self) -> Option<RenderInstruction> {
        self.queue.try_receive()
    }

    pub async fn next(&self) -> RenderInstruction {
        self.queue.receive().await
    }

    /// Take every queued instruction, oldest first.
    pub fn drain(&self) -> Vec<RenderInstruction> {
        self.queue.drain()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Applies render instructions to a [`MapSurface`]. Lives on the
/// presentation thread.
pub struct Presenter<S: MapSurface> {
    name: &'static str,
    surface: S,
    registry: Arc<WaypointRegistry>,
    vehicle_marker: Option<MarkerHandle>,
}

impl<S: MapSurface> Presenter<S> {
    pub fn new(surface: S, registry: Arc<WaypointRegistry>) -> Self {
        Self {
            name: "presenter",
            surface,
            registry,
            vehicle_marker: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn vehicle_marker(&self) -> Option<MarkerHandle> {
        self.vehicle_marker
    }

    /// Apply one instruction. Each instruction is applied as a whole, so the
    /// surface never observes a half-replaced vehicle marker.
    pub fn apply(&mut self, instruction: RenderInstruction) {
        match instruction {
            RenderInstruction::PlaceWaypointMarker { index, waypoint } => {
                let marker = self
                    .surface
                    .place_marker(MarkerKind::Waypoint(index), waypoint.position());

                // The waypoints were cleared before this got applied
                if !self.registry.register_marker(index, marker) {
                    debug!("[{}] Dropping marker of cleared waypoint {}", self.name, index);
                    self.surface.remove_marker(marker);
                }
            }
            RenderInstruction::TrackVehicle { position, zoom } => {
                if let Some(old) = self.vehicle_marker.take() {
                    self.surface.remove_marker(old);
                }
                let marker = self.surface.place_marker(MarkerKind::Vehicle, position);
                self.vehicle_marker = Some(marker);
                self.surface.move_camera(position, zoom);
            }
            RenderInstruction::ClearMarkers => {
                self.surface.clear_markers();
                self.vehicle_marker = None;
                self.registry.clear_markers();
            }
            RenderInstruction::Status(message) => {
                self.surface.show_status(&message.to_string());
            }
        }
    }

    /// Apply everything queued on the port. Returns the number of
    /// instructions applied.
    pub fn run_pending(&mut self, port: &PresentationPort) -> usize {
        let instructions = port.drain();
        let count = instructions.len();
        instructions
            .into_iter()
            .for_each(|instruction| self.apply(instruction));
        count
    }

    pub async fn main_loop(&mut self, port: &PresentationPort) -> ! {
        trace!("[{}] Starting main loop", self.name);
        loop {
            let instruction = port.next().await;
            self.apply(instruction);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::PreconditionError;

    /// A call made on the [`RecordingSurface`]
    #[derive(Debug, Clone, PartialEq)]
    pub enum SurfaceCall {
        Place(MarkerKind, MarkerHandle),
        Remove(MarkerHandle),
        Clear,
        Camera(Position, f64),
        Status(String),
    }

    /// Map surface that records what was drawn
    #[derive(Default)]
    pub struct RecordingSurface {
        next_handle: u64,
        pub live: Vec<(MarkerKind, MarkerHandle)>,
        pub calls: Vec<SurfaceCall>,
    }

    impl RecordingSurface {
        pub fn vehicle_markers(&self) -> usize {
            self.live
                .iter()
                .filter(|(kind, _)| *kind == MarkerKind::Vehicle)
                .count()
        }

        pub fn statuses(&self) -> Vec<String> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    SurfaceCall::Status(text) => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl MapSurface for RecordingSurface {
        fn place_marker(&mut self, kind: MarkerKind, _position: Position) -> MarkerHandle {
            let handle = MarkerHandle(self.next_handle);
            self.next_handle += 1;
            self.live.push((kind, handle));
            self.calls.push(SurfaceCall::Place(kind, handle));
            handle
        }

        fn remove_marker(&mut self, marker: MarkerHandle) {
            self.live.retain(|(_, handle)| *handle != marker);
            self.calls.push(SurfaceCall::Remove(marker));
        }

        fn clear_markers(&mut self) {
            self.live.clear();
            self.calls.push(SurfaceCall::Clear);
        }

        fn move_camera(&mut self, position: Position, zoom: f64) {
            self.calls.push(SurfaceCall::Camera(position, zoom));
        }

        fn show_status(&mut self, text: &str) {
            self.calls.push(SurfaceCall::Status(text.to_string()));
        }
    }

    fn track(lat: f64, lon: f64) -> RenderInstruction {
        RenderInstruction::TrackVehicle {
            position: Position::new(lat, lon),
            zoom: 18.0,
        }
    }

    #[test]
    fn vehicle_marker_is_replaced() {
        let registry = Arc::new(WaypointRegistry::new());
        let mut presenter = Presenter::new(RecordingSurface::default(), registry);

        presenter.apply(track(10.0, 20.0));
        presenter.apply(track(10.1, 20.1));
        presenter.apply(track(10.2, 20.2));

        assert_eq!(presenter.surface().vehicle_markers(), 1);
        assert_eq!(
            presenter.surface().calls.last(),
            Some(&SurfaceCall::Camera(Position::new(10.2, 20.2), 18.0))
        );
    }

    #[test]
    fn waypoint_markers_are_registered() {
        let registry = Arc::new(WaypointRegistry::new());
        let mut presenter = Presenter::new(RecordingSurface::default(), registry.clone());
        let port = PresentationPort::new();

        for i in 0..3 {
            let waypoint = Waypoint::new(10.0 + i as f64, 20.0, 0.0);
            let index = registry.add_waypoint(waypoint);
            port.post(RenderInstruction::PlaceWaypointMarker { index, waypoint });
        }

        assert_eq!(presenter.run_pending(&port), 3);
        assert_eq!(registry.marker_count(), 3);
        assert_eq!(presenter.surface().live.len(), 3);
    }

    #[test]
    fn markers_of_cleared_waypoints_are_removed() {
        let registry = Arc::new(WaypointRegistry::new());
        let mut presenter = Presenter::new(RecordingSurface::default(), registry.clone());

        let waypoint = Waypoint::new(10.0, 20.0, 0.0);
        let index = registry.add_waypoint(waypoint);
        registry.clear();

        presenter.apply(RenderInstruction::PlaceWaypointMarker { index, waypoint });
        assert!(presenter.surface().live.is_empty());
        assert_eq!(registry.marker_count(), 0);
    }

    #[test]
    fn clear_forgets_vehicle_marker() {
        let registry = Arc::new(WaypointRegistry::new());
        let mut presenter = Presenter::new(RecordingSurface::default(), registry);

        presenter.apply(track(10.0, 20.0));
        presenter.apply(RenderInstruction::ClearMarkers);
        assert_eq!(presenter.vehicle_marker(), None);

        presenter.apply(track(10.0, 20.0));
        assert_eq!(presenter.surface().vehicle_markers(), 1);
        assert!(!presenter
            .surface()
            .calls
            .iter()
            .skip_while(|call| **call != SurfaceCall::Clear)
            .any(|call| matches!(call, SurfaceCall::Remove(_))));
    }

    #[test]
    fn status_text() {
        let failed = StatusMessage::UploadFailed {
            error: GatewayError::new("link lost"),
            retrying: true,
        };
        assert_eq!(failed.to_string(), "Mission upload failed: link lost, retrying...");

        let rejected = StatusMessage::LoadFailed(GatewayError::new("Too many waypoints").into());
        assert_eq!(rejected.to_string(), "Mission load failed: Too many waypoints");

        let finished = StatusMessage::ExecutionFinished(None);
        assert_eq!(finished.to_string(), "Execution finished: success");

        let not_editing = StatusMessage::Rejected(PreconditionError::NotEditing.into());
        assert_eq!(not_editing.to_string(), "Precondition error: Waypoints can only be added in edit mode.");
    }

    #[test]
    fn statuses_reach_the_surface_in_order() {
        let registry = Arc::new(WaypointRegistry::new());
        let mut presenter = Presenter::new(RecordingSurface::default(), registry);
        let port = PresentationPort::new();

        port.status(StatusMessage::LoadSucceeded);
        port.status(StatusMessage::UploadSucceeded);
        presenter.run_pending(&port);

        assert_eq!(
            presenter.surface().statuses(),
            vec!["Mission load succeeded", "Mission upload succeeded"]
        );
    }

    #[test]
    fn queued_vehicle_positions_collapse() {
        let port = PresentationPort::new();
        for i in 0..1000 {
            port.post(track(10.0, i as f64 * 0.01));
        }
        assert_eq!(port.drain(), vec![track(10.0, 999.0 * 0.01)]);

        let waypoint = Waypoint::new(1.0, 1.0, 0.0);
        port.post(track(10.0, 1.0));
        port.post(RenderInstruction::PlaceWaypointMarker { index: 0, waypoint });
        port.post(track(10.0, 2.0));
        port.post(track(10.0, 3.0));
        port.status(StatusMessage::LoadSucceeded);
        port.post(track(10.0, 4.0));

        assert_eq!(
            port.drain(),
            vec![
                track(10.0, 1.0),
                RenderInstruction::PlaceWaypointMarker { index: 0, waypoint },
                track(10.0, 3.0),
                RenderInstruction::Status(StatusMessage::LoadSucceeded),
                track(10.0, 4.0),
            ]
        );
    }

    #[test]
    fn main_loop_applies_posted_instructions() {
        use core::future::poll_fn;
        use core::task::Poll;

        use embassy_futures::select::{select, Either};

        let registry = Arc::new(WaypointRegistry::new());
        let mut presenter = Presenter::new(RecordingSurface::default(), registry);
        let port = PresentationPort::new();

        port.post(track(1.0, 2.0));
        port.status(StatusMessage::LoadSucceeded);

        futures_executor::block_on(async {
            let drained = poll_fn(|_| match port.pending() {
                0 => Poll::Ready(()),
                _ => Poll::Pending,
            });
            match select(presenter.main_loop(&port), drained).await {
                Either::First(never) => never,
                Either::Second(()) => {}
            }
        });

        assert_eq!(presenter.surface().vehicle_markers(), 1);
        assert_eq!(presenter.surface().statuses(), vec!["Mission load succeeded"]);
    }
}
