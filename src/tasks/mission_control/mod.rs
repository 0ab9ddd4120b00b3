//! Mission control module
//!
//! Owns the mission lifecycle. User commands are handled synchronously
//! against the current phase, gateway calls are issued without waiting for
//! them, and their completions and the lifecycle events of the vehicle are
//! received through the inbox and applied in arrival order.

use std::sync::Arc;

use embassy_futures::select::{select, Either};
use embassy_sync::watch::Watch;

pub mod message;
pub use message::{Command, Response};

use crate::config::SessionConfig;
use crate::errors::{GatewayError, MissionError, PreconditionError};
use crate::gateway::{
    Completion, EventSink, Inbound, ListenerId, MissionEvent, MissionGateway, Operation, Progress,
    Ticket,
};
use crate::mission::{MissionBuilder, WaypointRegistry};
use crate::presentation::{PresentationPort, RenderInstruction, StatusMessage};
use crate::sync::channel::Channel;
use crate::types::mission::{MissionDefinition, MissionId, MissionSettings};
use crate::types::phase::{MissionPhase, Outcome};
use crate::types::waypoint::Waypoint;
use crate::M;

/// Maximum number of concurrent receivers of the phase and progress watches
pub const WATCH_RECEIVERS: usize = 4;

pub type PhaseWatch = Watch<M, MissionPhase, WATCH_RECEIVERS>;
pub type ProgressWatch = Watch<M, Progress, WATCH_RECEIVERS>;

/// The mission currently loaded into the gateway
struct ActiveMission {
    definition: MissionDefinition,
    upload_attempt: u8,
    start_requested: bool,
    stop_requested: bool,
}

impl ActiveMission {
    fn id(&self) -> MissionId {
        self.definition.id()
    }
}

/// The mission lifecycle state machine
pub struct MissionControl<G: MissionGateway> {
    name: &'static str,
    gateway: G,
    listener: ListenerId,
    builder: MissionBuilder,
    registry: Arc<WaypointRegistry>,
    port: Arc<PresentationPort>,
    inbox: Arc<Channel<Inbound>>,
    phase: MissionPhase,
    phase_watch: Arc<PhaseWatch>,
    progress_watch: Arc<ProgressWatch>,
    active: Option<ActiveMission>,
    next_mission: u32,
    edit_mode: bool,
    upload_retries: u8,
    invalidate_on_edit: bool,
}

impl<G: MissionGateway> MissionControl<G> {
    /// Create the state machine and register its event listener with the
    /// gateway. The listener is removed again when this is dropped.
    pub fn new(
        mut gateway: G,
        registry: Arc<WaypointRegistry>,
        port: Arc<PresentationPort>,
        config: &SessionConfig,
    ) -> Self {
        let name = "mission_control";
        let inbox = Arc::new(Channel::new());
        let listener = gateway.add_listener(EventSink::new(inbox.clone()));
        debug!("[{}] Registered gateway listener {:?}", name, listener);

        let phase_watch = Arc::new(PhaseWatch::new());
        phase_watch.sender().send(MissionPhase::Editing);

        Self {
            name,
            gateway,
            listener,
            builder: MissionBuilder::new(config.settings),
            registry,
            port,
            inbox,
            phase: MissionPhase::Editing,
            phase_watch,
            progress_watch: Arc::new(ProgressWatch::new()),
            active: None,
            next_mission: 0,
            edit_mode: false,
            upload_retries: config.upload_retries,
            invalidate_on_edit: config.invalidate_on_edit,
        }
    }

    pub fn phase(&self) -> &MissionPhase {
        &self.phase
    }

    /// Latest-value signal of the phase, for observers on other threads
    pub fn phase_watch(&self) -> Arc<PhaseWatch> {
        self.phase_watch.clone()
    }

    /// Latest-value signal of the download, upload and execution progress
    pub fn progress_watch(&self) -> Arc<ProgressWatch> {
        self.progress_watch.clone()
    }

    /// The mission currently loaded into the gateway, if any
    pub fn active_mission(&self) -> Option<&MissionDefinition> {
        self.active.as_ref().map(|active| &active.definition)
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn builder(&self) -> &MissionBuilder {
        &self.builder
    }

    pub fn registry(&self) -> &Arc<WaypointRegistry> {
        &self.registry
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn main_loop(&mut self, commands: &Channel<Command>) -> ! {
        trace!("[{}] Starting main loop", self.name);
        let inbox = self.inbox.clone();
        loop {
            match select(commands.receive(), inbox.receive()).await {
                Either::First(command) => {
                    let response = self.handle_command(command);
                    trace!("[{}] Responded with: {:?}", self.name, response);
                }
                Either::Second(message) => self.handle_inbound(message),
            }
        }
    }

    /// Process every gateway message queued so far, in arrival order.
    /// Returns the number of messages processed.
    pub fn process_pending(&mut self) -> usize {
        let messages = self.inbox.drain();
        let count = messages.len();
        for message in messages {
            self.handle_inbound(message);
        }
        count
    }

    /// Handle an incoming command.
    ///
    /// This is NOT async. Gateway calls are only issued here, their outcome
    /// arrives later through the inbox. Commands that do not fit the current
    /// phase are rejected without changing it.
    pub fn handle_command(&mut self, command: Command) -> Response {
        trace!("[{}] Handling command: {:?}", self.name, command);
        match command {
            Command::AddWaypoint(waypoint) => self.add_waypoint(waypoint),
            Command::ClearWaypoints => self.clear_waypoints(),
            Command::Configure(settings) => self.configure(settings),
            Command::Upload => self.upload(),
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::ToggleEditMode => {
                self.edit_mode = !self.edit_mode;
                info!("[{}] Edit mode: {}", self.name, self.edit_mode);
                Response::EditMode(self.edit_mode)
            }
        }
    }

    /// Handle a completion or event received from the gateway.
    pub fn handle_inbound(&mut self, message: Inbound) {
        match message {
            Inbound::Completed { ticket, result } => self.handle_completion(ticket, result),
            Inbound::Event(event) => self.handle_event(event),
        }
    }

    fn set_phase(&mut self, phase: MissionPhase) {
        if self.phase != phase {
            debug!("[{}] Phase {:?} -> {:?}", self.name, self.phase.kind(), phase.kind());
        }
        self.phase_watch.sender().send(phase.clone());
        self.phase = phase;
    }

    /// Log the error, show it to the user and wrap it into a response.
    pub(crate) fn reject(&self, error: impl Into<MissionError>) -> Response {
        let error = error.into();
        warn!("[{}] Rejected: {}", self.name, error);
        self.port.status(StatusMessage::Rejected(error.clone()));
        Response::Rejected(error)
    }

    fn busy(&self) -> Response {
        self.reject(PreconditionError::Busy(self.phase.kind()))
    }

    fn completion(&self, mission: MissionId, operation: Operation) -> Completion {
        Completion::new(Ticket { mission, operation }, self.inbox.clone())
    }

    fn add_waypoint(&mut self, waypoint: Waypoint) -> Response {
        if !self.edit_mode {
            warn!("[{}] Cannot add waypoint outside edit mode", self.name);
            self.port.status(StatusMessage::CannotAddWaypoint);
            return Response::Rejected(PreconditionError::NotEditing.into());
        }

        // A mission the vehicle is working on stays until it ends
        let engaged = self.phase.is_busy()
            || self.active.as_ref().is_some_and(|active| active.start_requested);
        let discard = self.phase.is_terminal() || (self.invalidate_on_edit && !engaged);
        if discard {
            if let Some(active) = self.active.take() {
                info!("[{}] Discarding mission {}", self.name, active.id());
            }
            self.set_phase(MissionPhase::Editing);
        }

        let index = self.registry.add_waypoint(waypoint);
        debug!("[{}] Added waypoint {}: {:?}", self.name, index, waypoint);
        self.port
            .post(RenderInstruction::PlaceWaypointMarker { index, waypoint });

        Response::Added(index)
    }

    fn clear_waypoints(&mut self) -> Response {
        if self.registry.is_empty() {
            return Response::Unchanged;
        }

        self.registry.clear();
        self.port.post(RenderInstruction::ClearMarkers);
        info!("[{}] Cleared all waypoints", self.name);
        Response::Accepted
    }

    fn configure(&mut self, settings: MissionSettings) -> Response {
        self.builder.apply(settings);

        let id = MissionId(self.next_mission);
        let definition = match self.builder.freeze(&self.registry, id) {
            Ok(definition) => definition,
            Err(error) => return self.reject(error),
        };
        self.next_mission = self.next_mission.wrapping_add(1);
        self.port
            .status(StatusMessage::AltitudeApplied(settings.altitude));

        if let Some(previous) = self.active.take() {
            debug!("[{}] Mission {} superseded by {}", self.name, previous.id(), id);
        }
        self.set_phase(MissionPhase::Configured);

        match self.gateway.load_mission(&definition) {
            Ok(()) => {
                info!(
                    "[{}] Loaded mission {} with {} waypoints",
                    self.name,
                    id,
                    definition.waypoint_count()
                );
                self.active = Some(ActiveMission {
                    definition,
                    upload_attempt: 0,
                    start_requested: false,
                    stop_requested: false,
                });
                self.set_phase(MissionPhase::Loaded(Outcome::Ok));
                self.port.status(StatusMessage::LoadSucceeded);
                Response::Accepted
            }
            Err(error) => {
                error!("[{}] Failed to load mission {}: {}", self.name, id, error);
                let error = MissionError::from(error);
                self.set_phase(MissionPhase::Loaded(Outcome::Failed(error.clone())));
                self.port.status(StatusMessage::LoadFailed(error.clone()));
                Response::Rejected(error)
            }
        }
    }

    fn upload(&mut self) -> Response {
        let Some(id) = self.active.as_ref().map(ActiveMission::id) else {
            return self.reject(PreconditionError::NoMissionLoaded);
        };

        match self.phase {
            MissionPhase::Loaded(Outcome::Ok)
            | MissionPhase::Uploaded(_)
            | MissionPhase::Finished(_)
            | MissionPhase::Stopped => {}
            _ => return self.busy(),
        }

        if let Some(active) = self.active.as_mut() {
            active.upload_attempt = 0;
        }

        info!("[{}] Uploading mission {}", self.name, id);
        self.set_phase(MissionPhase::Uploading);
        let completion = self.completion(id, Operation::Upload { attempt: 0 });
        self.gateway.upload_mission(completion);
        Response::Accepted
    }

    fn start(&mut self) -> Response {
        let Some(id) = self.active.as_ref().map(ActiveMission::id) else {
            return self.reject(PreconditionError::NoMissionLoaded);
        };

        if self.phase.is_busy() {
            return self.busy();
        }

        if let Some(active) = self.active.as_mut() {
            active.start_requested = true;
            active.stop_requested = false;
        }

        info!("[{}] Requesting start of mission {}", self.name, id);
        let completion = self.completion(id, Operation::Start);
        self.gateway.start_mission(completion);
        Response::Accepted
    }

    fn stop(&mut self) -> Response {
        let Some(id) = self.active.as_ref().map(ActiveMission::id) else {
            return self.reject(PreconditionError::NoMissionLoaded);
        };

        info!("[{}] Requesting stop of mission {}", self.name, id);
        let completion = self.completion(id, Operation::Stop);
        self.gateway.stop_mission(completion);
        Response::Accepted
    }

    fn handle_completion(&mut self, ticket: Ticket, result: Result<(), GatewayError>) {
        let Some(active) = self
            .active
            .as_mut()
            .filter(|active| active.id() == ticket.mission)
        else {
            debug!("[{}] Ignoring stale completion: {:?}", self.name, ticket);
            return;
        };

        match ticket.operation {
            Operation::Upload { attempt } => {
                if attempt != active.upload_attempt || self.phase != MissionPhase::Uploading {
                    debug!("[{}] Ignoring stale completion: {:?}", self.name, ticket);
                    return;
                }

                match result {
                    Ok(()) => {
                        info!("[{}] Mission {} uploaded", self.name, ticket.mission);
                        self.set_phase(MissionPhase::Uploaded(Outcome::Ok));
                        self.port.status(StatusMessage::UploadSucceeded);
                    }
                    Err(error) => {
                        let retrying = attempt < self.upload_retries;
                        if retrying {
                            active.upload_attempt = attempt + 1;
                        }

                        error!(
                            "[{}] Upload of mission {} failed (attempt {}): {}",
                            self.name, ticket.mission, attempt, error
                        );
                        self.set_phase(MissionPhase::Uploaded(Outcome::Failed(
                            error.clone().into(),
                        )));
                        self.port
                            .status(StatusMessage::UploadFailed { error, retrying });

                        if retrying {
                            let operation = Operation::Upload {
                                attempt: attempt + 1,
                            };
                            self.set_phase(MissionPhase::Uploading);
                            let completion = self.completion(ticket.mission, operation);
                            self.gateway.retry_upload_mission(completion);
                        }
                    }
                }
            }
            Operation::Start => {
                match &result {
                    Ok(()) => info!("[{}] Start of mission {} accepted", self.name, ticket.mission),
                    Err(error) => {
                        active.start_requested = false;
                        error!("[{}] Failed to start mission: {}", self.name, error)
                    }
                }
                self.port.status(StatusMessage::StartResult(result.err()));
            }
            Operation::Stop => {
                match &result {
                    Ok(()) => {
                        active.stop_requested = true;
                        info!("[{}] Stop of mission {} accepted", self.name, ticket.mission);
                    }
                    Err(error) => error!("[{}] Failed to stop mission: {}", self.name, error),
                }
                self.port.status(StatusMessage::StopResult(result.err()));
            }
        }
    }

    fn handle_event(&mut self, event: MissionEvent) {
        match event {
            MissionEvent::Progress(progress) => {
                trace!("[{}] Progress: {:?}", self.name, progress);
                self.progress_watch.sender().send(progress);
            }
            MissionEvent::ExecutionStarted => {
                if self.active.is_none() {
                    debug!("[{}] Ignoring execution start without a mission", self.name);
                    return;
                }
                info!("[{}] Mission execution started", self.name);
                self.set_phase(MissionPhase::Executing);
            }
            MissionEvent::ExecutionFinished(error) => {
                if self.phase != MissionPhase::Executing {
                    debug!("[{}] Ignoring execution finish while {:?}", self.name, self.phase.kind());
                    return;
                }

                let stopped = self.active.as_mut().is_some_and(|active| {
                    active.start_requested = false;
                    active.stop_requested
                });

                match &error {
                    None => info!("[{}] Mission execution finished", self.name),
                    Some(error) => error!("[{}] Mission execution finished: {}", self.name, error),
                }
                self.port
                    .status(StatusMessage::ExecutionFinished(error.clone()));

                if stopped {
                    self.set_phase(MissionPhase::Stopped);
                } else {
                    self.set_phase(MissionPhase::Finished(Outcome::from_result(
                        error.map_or(Ok(()), Err),
                    )));
                }
            }
        }
    }
}

impl<G: MissionGateway> Drop for MissionControl<G> {
    fn drop(&mut self) {
        debug!("[{}] Removing gateway listener {:?}", self.name, self.listener);
        self.gateway.remove_listener(self.listener);
    }
}
