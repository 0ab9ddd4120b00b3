use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;
use std::collections::VecDeque;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use embassy_sync::waitqueue::WakerRegistration;

use crate::M as DefaultMutex;

/// Unbounded multi-producer, single-consumer channel.
///
/// Sending never blocks and never fails, so it is safe to call from
/// callbacks running on threads we do not own. Values are received in
/// exactly the order they were sent.
pub struct Channel<T, M: RawMutex = DefaultMutex> {
    state: Mutex<M, RefCell<State<T>>>,
}

struct State<T> {
    queue: VecDeque<T>,
    recv_waker: WakerRegistration,
}

impl<T, M: RawMutex> Default for Channel<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M: RawMutex> Channel<T, M> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                queue: VecDeque::new(),
                recv_waker: WakerRegistration::new(),
            })),
        }
    }

    pub fn send(&self, value: T) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.queue.push_back(value);
            state.recv_waker.wake();
        })
    }

    /// Send a value, overwriting the newest queued one instead if
    /// `replaces` returns `true` for it. Older values are never touched.
    pub fn send_or_replace_last(&self, value: T, replaces: impl FnOnce(&T) -> bool) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            match state.queue.back_mut() {
                Some(last) if replaces(last) => *last = value,
                _ => state.queue.push_back(value),
            }
            state.recv_waker.wake();
        })
    }

    pub fn try_receive(&self) -> Option<T> {
        self.state.lock(|state| state.borrow_mut().queue.pop_front())
    }

    pub async fn receive(&self) -> T {
        poll_fn(|cx| {
            self.state.lock(|state| {
                let mut state = state.borrow_mut();
                match state.queue.pop_front() {
                    Some(value) => Poll::Ready(value),
                    None => {
                        state.recv_waker.register(cx.waker());
                        Poll::Pending
                    }
                }
            })
        })
        .await
    }

    /// Take every value currently queued, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.state
            .lock(|state| state.borrow_mut().queue.drain(..).collect())
    }

    pub fn len(&self) -> usize {
        self.state.lock(|state| state.borrow().queue.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
