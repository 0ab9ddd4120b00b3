//! Mission editing session
//!
//! A [`Session`] owns everything a single editing session needs: the
//! waypoint registry, the mission control task, the telemetry tracker and
//! the presentation port they all write to. Dropping it tears the session
//! down and removes the gateway listener.

use std::sync::Arc;

use crate::config::SessionConfig;
use crate::errors::PreconditionError;
use crate::gateway::{MissionGateway, TelemetrySource};
use crate::geo;
use crate::mission::WaypointRegistry;
use crate::presentation::{MapSurface, PresentationPort, Presenter};
use crate::tasks::mission_control::{Command, MissionControl, Response};
use crate::tasks::telemetry::TelemetryTracker;
use crate::types::mission::MissionSettings;
use crate::types::phase::MissionPhase;
use crate::types::waypoint::Waypoint;

pub struct Session<G: MissionGateway> {
    control: MissionControl<G>,
    tracker: Arc<TelemetryTracker>,
    registry: Arc<WaypointRegistry>,
    port: Arc<PresentationPort>,
    config: SessionConfig,
}

impl<G: MissionGateway> Session<G> {
    pub fn open(gateway: G, config: SessionConfig) -> Self {
        info!("[session] Opening mission session");
        let registry = Arc::new(WaypointRegistry::new());
        let port = Arc::new(PresentationPort::new());
        let tracker = Arc::new(TelemetryTracker::new(port.clone(), config.camera_zoom));
        let control = MissionControl::new(gateway, registry.clone(), port.clone(), &config);

        Self {
            control,
            tracker,
            registry,
            port,
            config,
        }
    }

    /// Create the presenter that applies this session's render
    /// instructions to the given surface.
    pub fn presenter<S: MapSurface>(&self, surface: S) -> Presenter<S> {
        Presenter::new(surface, self.registry.clone())
    }

    /// Route the fixes of the given source into the telemetry tracker.
    pub fn attach_telemetry(&self, source: &mut impl TelemetrySource) {
        self.tracker.attach(source)
    }

    pub fn port(&self) -> &Arc<PresentationPort> {
        &self.port
    }

    pub fn tracker(&self) -> &Arc<TelemetryTracker> {
        &self.tracker
    }

    pub fn registry(&self) -> &Arc<WaypointRegistry> {
        &self.registry
    }

    pub fn control(&self) -> &MissionControl<G> {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut MissionControl<G> {
        &mut self.control
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> &MissionPhase {
        self.control.phase()
    }

    /// Apply the gateway completions and events received so far.
    pub fn process_pending(&mut self) -> usize {
        self.control.process_pending()
    }

    pub fn add_waypoint(&mut self, latitude: f64, longitude: f64, altitude: f32) -> Response {
        self.control
            .handle_command(Command::AddWaypoint(Waypoint::new(latitude, longitude, altitude)))
    }

    /// Add a waypoint at the last known vehicle position.
    pub fn add_waypoint_at_vehicle(&mut self, altitude: f32) -> Response {
        match self.tracker.last_position() {
            Some(pos) if geo::is_valid(pos.latitude, pos.longitude) => {
                self.add_waypoint(pos.latitude, pos.longitude, altitude)
            }
            _ => self.control.reject(PreconditionError::NoVehicleFix),
        }
    }

    pub fn clear_waypoints(&mut self) -> Response {
        self.control.handle_command(Command::ClearWaypoints)
    }

    pub fn configure(&mut self, settings: MissionSettings) -> Response {
        self.control.handle_command(Command::Configure(settings))
    }

    pub fn upload(&mut self) -> Response {
        self.control.handle_command(Command::Upload)
    }

    pub fn start(&mut self) -> Response {
        self.control.handle_command(Command::Start)
    }

    pub fn stop(&mut self) -> Response {
        self.control.handle_command(Command::Stop)
    }

    pub fn toggle_edit_mode(&mut self) -> Response {
        self.control.handle_command(Command::ToggleEditMode)
    }

    /// Center the map on the vehicle again, if its position is known.
    pub fn locate(&self) -> bool {
        self.tracker.locate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GatewayError;
    use crate::gateway::mock::MockGateway;
    use crate::gateway::MissionEvent;
    use crate::presentation::tests::RecordingSurface;
    use crate::presentation::{MarkerKind, RenderInstruction, StatusMessage};
    use crate::types::mission::{FinishedAction, HeadingMode, SpeedPreset};
    use crate::types::phase::Outcome;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn full_mission_round() {
        init_logger();

        let mut gateway = MockGateway::new();
        let mut session = Session::open(gateway.clone(), SessionConfig::default());
        let mut presenter = session.presenter(RecordingSurface::default());
        session.attach_telemetry(&mut gateway);

        gateway.push_fix(55.70, 12.50);
        assert_eq!(session.toggle_edit_mode(), Response::EditMode(true));
        assert_eq!(session.add_waypoint_at_vehicle(0.0), Response::Added(0));
        assert_eq!(session.add_waypoint(55.71, 12.51, 0.0), Response::Added(1));

        let settings = MissionSettings {
            altitude: MissionSettings::parse_altitude("8 0"),
            finished_action: FinishedAction::GoHome,
            heading_mode: HeadingMode::Auto,
            ..MissionSettings::default()
        }
        .with_speed_preset(SpeedPreset::Mid);
        assert_eq!(session.configure(settings), Response::Accepted);
        assert_eq!(session.upload(), Response::Accepted);

        gateway.emit(MissionEvent::Progress(crate::gateway::Progress::Upload {
            current: 2,
            total: 2,
        }));
        gateway.complete_next(None);
        session.process_pending();
        assert_eq!(session.phase(), &MissionPhase::Uploaded(Outcome::Ok));

        assert_eq!(session.start(), Response::Accepted);
        gateway.complete_next(None);
        gateway.emit(MissionEvent::ExecutionStarted);
        gateway.push_fix(55.705, 12.505);
        gateway.emit(MissionEvent::ExecutionFinished(None));
        session.process_pending();
        assert_eq!(session.phase(), &MissionPhase::Finished(Outcome::Ok));

        presenter.run_pending(session.port());
        let surface = presenter.surface();
        assert_eq!(surface.vehicle_markers(), 1);
        assert_eq!(
            surface
                .live
                .iter()
                .filter(|(kind, _)| matches!(kind, MarkerKind::Waypoint(_)))
                .count(),
            2
        );
        assert_eq!(session.registry().marker_count(), 2);

        let mission = gateway.loaded().unwrap();
        assert_eq!(mission.waypoint_count(), 2);
        assert!(mission.waypoints().iter().all(|w| w.altitude == 80.0));
        assert_eq!(mission.config().auto_flight_speed, 5.0);

        let statuses = surface.statuses();
        assert!(statuses.contains(&"Mission upload succeeded".to_string()));
        assert!(statuses.contains(&"Execution finished: success".to_string()));
    }

    #[test]
    fn waypoint_at_vehicle_needs_a_fix() {
        init_logger();

        let mut gateway = MockGateway::new();
        let mut session = Session::open(gateway.clone(), SessionConfig::default());
        session.attach_telemetry(&mut gateway);
        session.toggle_edit_mode();

        assert_eq!(
            session.add_waypoint_at_vehicle(50.0),
            Response::Rejected(PreconditionError::NoVehicleFix.into())
        );
        gateway.push_fix(0.0, 0.0);
        assert!(session.add_waypoint_at_vehicle(50.0).is_rejected());
        assert!(!session.locate());
        assert!(session.registry().is_empty());

        let rejected = StatusMessage::Rejected(PreconditionError::NoVehicleFix.into());
        let statuses: Vec<_> = session
            .port()
            .drain()
            .into_iter()
            .filter_map(|instruction| match instruction {
                RenderInstruction::Status(message) => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![rejected.clone(), rejected]);
    }

    #[test]
    fn clear_removes_everything_from_the_map() {
        init_logger();

        let mut gateway = MockGateway::new();
        let mut session = Session::open(gateway.clone(), SessionConfig::default());
        let mut presenter = session.presenter(RecordingSurface::default());
        session.attach_telemetry(&mut gateway);

        session.toggle_edit_mode();
        session.add_waypoint(10.0, 10.0, 0.0);
        session.add_waypoint(11.0, 11.0, 0.0);
        gateway.push_fix(10.5, 10.5);
        presenter.run_pending(session.port());
        assert_eq!(presenter.surface().live.len(), 3);

        assert_eq!(session.clear_waypoints(), Response::Accepted);
        presenter.run_pending(session.port());
        assert!(presenter.surface().live.is_empty());
        assert_eq!(session.registry().marker_count(), 0);

        // The vehicle marker comes back with the next fix, or on request
        assert!(session.locate());
        presenter.run_pending(session.port());
        assert_eq!(presenter.surface().vehicle_markers(), 1);
    }

    #[test]
    fn closing_removes_the_listener() {
        init_logger();

        let gateway = MockGateway::new();
        let mut session = Session::open(gateway.clone(), SessionConfig::default());
        assert_eq!(gateway.listener_count(), 1);

        session.toggle_edit_mode();
        session.add_waypoint(10.0, 10.0, 0.0);
        gateway.fail_next_load("Mission not supported");
        assert!(session.configure(MissionSettings::default()).is_rejected());
        assert_eq!(
            session.phase(),
            &MissionPhase::Loaded(Outcome::Failed(
                GatewayError::new("Mission not supported").into()
            ))
        );

        drop(session);
        assert_eq!(gateway.listener_count(), 0);
    }
}
