//! Mock gateway for testing
//!
//! [`MockGateway`] is a cheap handle to shared state, so a test can hand one
//! clone to the mission control task and keep another to inspect the calls
//! it made, resolve outstanding completions, and emit lifecycle events.

use core::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;

use super::{
    Completion, EventSink, ListenerId, MissionEvent, MissionGateway, PositionCallback,
    TelemetrySource, Ticket,
};
use crate::errors::GatewayError;
use crate::types::mission::{MissionDefinition, MissionId};
use crate::M;

/// A call made on the mock, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(MissionId),
    Upload(Ticket),
    RetryUpload(Ticket),
    Start(Ticket),
    Stop(Ticket),
    AddListener(ListenerId),
    RemoveListener(ListenerId),
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    load_results: VecDeque<Result<(), GatewayError>>,
    loaded: Option<MissionDefinition>,
    pending: VecDeque<Completion>,
    listeners: BTreeMap<ListenerId, EventSink>,
    next_listener: u32,
    position_callback: Option<Arc<PositionCallback>>,
}

/// In-memory [`MissionGateway`] and [`TelemetrySource`].
#[derive(Clone)]
pub struct MockGateway {
    state: Arc<Mutex<M, RefCell<MockState>>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RefCell::new(MockState::default()))),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<Call> {
        self.with(|state| state.calls.clone())
    }

    /// Make the next `load_mission` fail with the given description
    pub fn fail_next_load(&self, description: &str) {
        self.with(|state| {
            state
                .load_results
                .push_back(Err(GatewayError::new(description)))
        })
    }

    /// The mission most recently accepted by `load_mission`
    pub fn loaded(&self) -> Option<MissionDefinition> {
        self.with(|state| state.loaded.clone())
    }

    /// Tickets of the completions not yet resolved, oldest first
    pub fn pending(&self) -> Vec<Ticket> {
        self.with(|state| state.pending.iter().map(Completion::ticket).collect())
    }

    /// Resolve the oldest outstanding completion
    pub fn complete_next(&self, error: Option<GatewayError>) -> Option<Ticket> {
        let completion = self.with(|state| state.pending.pop_front())?;
        let ticket = completion.ticket();
        completion.complete(error);
        Some(ticket)
    }

    /// Resolve the outstanding completion with the given ticket
    pub fn complete(&self, ticket: Ticket, error: Option<GatewayError>) -> bool {
        let completion = self.with(|state| {
            let pos = state.pending.iter().position(|c| c.ticket() == ticket)?;
            state.pending.remove(pos)
        });

        match completion {
            Some(completion) => {
                completion.complete(error);
                true
            }
            None => false,
        }
    }

    /// Deliver an event to every registered listener
    pub fn emit(&self, event: MissionEvent) {
        let listeners: Vec<EventSink> =
            self.with(|state| state.listeners.values().cloned().collect());
        for listener in listeners {
            listener.emit(event.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.with(|state| state.listeners.len())
    }

    /// Push a position fix through the installed callback, as the vehicle
    /// link would. Returns `false` if no callback is installed.
    pub fn push_fix(&self, latitude: f64, longitude: f64) -> bool {
        match self.with(|state| state.position_callback.clone()) {
            Some(callback) => {
                callback(latitude, longitude);
                true
            }
            None => false,
        }
    }

    fn record_pending(&self, call: Call, completion: Completion) {
        self.with(|state| {
            state.calls.push(call);
            state.pending.push_back(completion);
        })
    }
}

impl MissionGateway for MockGateway {
    fn load_mission(&mut self, mission: &MissionDefinition) -> Result<(), GatewayError> {
        self.with(|state| {
            state.calls.push(Call::Load(mission.id()));
            let result = state.load_results.pop_front().unwrap_or(Ok(()));
            if result.is_ok() {
                state.loaded = Some(mission.clone());
            }
            result
        })
    }

    fn upload_mission(&mut self, completion: Completion) {
        self.record_pending(Call::Upload(completion.ticket()), completion)
    }

    fn retry_upload_mission(&mut self, completion: Completion) {
        self.record_pending(Call::RetryUpload(completion.ticket()), completion)
    }

    fn start_mission(&mut self, completion: Completion) {
        self.record_pending(Call::Start(completion.ticket()), completion)
    }

    fn stop_mission(&mut self, completion: Completion) {
        self.record_pending(Call::Stop(completion.ticket()), completion)
    }

    fn add_listener(&mut self, sink: EventSink) -> ListenerId {
        self.with(|state| {
            let id = ListenerId(state.next_listener);
            state.next_listener += 1;
            state.listeners.insert(id, sink);
            state.calls.push(Call::AddListener(id));
            id
        })
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.with(|state| {
            state.listeners.remove(&id);
            state.calls.push(Call::RemoveListener(id));
        })
    }
}

impl TelemetrySource for MockGateway {
    fn set_position_callback(&mut self, callback: PositionCallback) {
        self.with(|state| state.position_callback = Some(Arc::new(callback)))
    }
}
