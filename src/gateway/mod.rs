//! Interfaces to the vehicle-side mission service
//!
//! The [`MissionGateway`] is implemented outside this crate, on top of
//! whatever SDK talks to the vehicle. Every operation except `load` returns
//! immediately and reports its outcome later through a [`Completion`],
//! possibly on a thread we do not own. Completions and lifecycle events
//! are never acted on directly; they are queued as [`Inbound`] messages
//! and processed by the mission control task in the order they arrived.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::sync::channel::Channel;
use crate::types::mission::{MissionDefinition, MissionId};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// Abstraction over the asynchronous mission service of the vehicle.
pub trait MissionGateway {
    /// Hand a frozen mission to the service. This only checks the mission
    /// for structural validity, nothing is sent to the vehicle yet.
    fn load_mission(&mut self, mission: &MissionDefinition) -> Result<(), GatewayError>;

    /// Transfer the loaded mission to the vehicle.
    fn upload_mission(&mut self, completion: Completion);

    /// Transfer the loaded mission again after a failed upload.
    fn retry_upload_mission(&mut self, completion: Completion);

    /// Ask the vehicle to start flying the uploaded mission. The completion
    /// only tells whether the request was accepted, the actual start is
    /// reported with [`EventSink::on_execution_start`].
    fn start_mission(&mut self, completion: Completion);

    /// Ask the vehicle to stop flying the mission.
    fn stop_mission(&mut self, completion: Completion);

    /// Subscribe to the lifecycle events of the mission service.
    fn add_listener(&mut self, sink: EventSink) -> ListenerId;

    fn remove_listener(&mut self, id: ListenerId);
}

/// Callback type for live position fixes, as `(latitude, longitude)`.
pub type PositionCallback = Box<dyn Fn(f64, f64) + Send + Sync>;

/// Push source of vehicle position fixes.
pub trait TelemetrySource {
    /// Install the callback invoked for every received fix, replacing any
    /// previously installed one.
    fn set_position_callback(&mut self, callback: PositionCallback);
}

/// Identifies a registered event listener.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u32);

/// The kind of gateway call a [`Ticket`] was issued for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Upload attempt, 0 for the first try and counting up for retries
    Upload { attempt: u8 },
    Start,
    Stop,
}

/// Identity of an outstanding gateway call: which mission it was made for
/// and what it asked for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub mission: MissionId,
    pub operation: Operation,
}

/// Progress reported by the mission service while it works.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Progress {
    /// Reading a mission back from the vehicle
    Download { current: usize, total: usize },
    /// Writing the mission to the vehicle
    Upload { current: usize, total: usize },
    /// Flying the mission, with the index of the waypoint being approached
    Execution { target_waypoint: usize, total: usize },
}

/// Lifecycle events emitted by the mission service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MissionEvent {
    Progress(Progress),
    ExecutionStarted,
    ExecutionFinished(Option<GatewayError>),
}

/// Everything the gateway can hand back to the mission control task.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Completed {
        ticket: Ticket,
        result: Result<(), GatewayError>,
    },
    Event(MissionEvent),
}

/// One-shot completion for an asynchronous gateway call.
///
/// Consumed by [`Completion::complete`], so every call is reported at most
/// once. Dropping it without completing leaves the call outstanding.
pub struct Completion {
    ticket: Ticket,
    inbox: Arc<Channel<Inbound>>,
}

impl core::fmt::Debug for Completion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Completion")
            .field("ticket", &self.ticket)
            .finish()
    }
}

impl Completion {
    pub(crate) fn new(ticket: Ticket, inbox: Arc<Channel<Inbound>>) -> Self {
        Self { ticket, inbox }
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Report the outcome of the call. `None` means success.
    pub fn complete(self, error: Option<GatewayError>) {
        let result = match error {
            None => Ok(()),
            Some(error) => Err(error),
        };
        self.inbox.send(Inbound::Completed {
            ticket: self.ticket,
            result,
        });
    }
}

/// Listener handed to [`MissionGateway::add_listener`]. Cheap to clone
/// and safe to call from any thread.
#[derive(Clone)]
pub struct EventSink {
    inbox: Arc<Channel<Inbound>>,
}

impl EventSink {
    pub(crate) fn new(inbox: Arc<Channel<Inbound>>) -> Self {
        Self { inbox }
    }

    pub fn on_download_update(&self, current: usize, total: usize) {
        self.emit(MissionEvent::Progress(Progress::Download { current, total }))
    }

    pub fn on_upload_update(&self, current: usize, total: usize) {
        self.emit(MissionEvent::Progress(Progress::Upload { current, total }))
    }

    pub fn on_execution_update(&self, target_waypoint: usize, total: usize) {
        self.emit(MissionEvent::Progress(Progress::Execution {
            target_waypoint,
            total,
        }))
    }

    pub fn on_execution_start(&self) {
        self.emit(MissionEvent::ExecutionStarted)
    }

    pub fn on_execution_finish(&self, error: Option<GatewayError>) {
        self.emit(MissionEvent::ExecutionFinished(error))
    }

    pub fn emit(&self, event: MissionEvent) {
        self.inbox.send(Inbound::Event(event))
    }
}
