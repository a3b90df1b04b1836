//! Broadcast-once handshake gate.
//!
//! The stream reader signals the client ID once; every submission waits on
//! the gate and every waiter, early or late, observes the same value. A
//! single-consumer channel would hand the ID to the first waiter only.

use crate::error::{RealtimeError, Result};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct GateState {
    value: Option<String>,
    closed: bool,
}

/// Single-slot, write-once, read-many synchronization point.
#[derive(Debug, Default)]
pub struct HandshakeGate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

impl HandshakeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the slot if empty and wake all waiters.
    ///
    /// Returns false without touching the stored value if the gate was
    /// already signaled or closed. Never blocks on waiters.
    pub fn signal(&self, value: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        if state.value.is_some() || state.closed {
            return false;
        }
        state.value = Some(value.into());
        drop(state);
        self.condvar.notify_all();
        true
    }

    /// Block until the value is available, the gate closes, or `timeout`
    /// elapses.
    ///
    /// A timeout too large to express as a deadline waits without limit.
    pub fn wait(&self, timeout: Duration) -> Result<String> {
        let mut state = self.state.lock();
        let mut deadline = None;
        loop {
            if let Some(value) = &state.value {
                return Ok(value.clone());
            }
            if state.closed {
                return Err(RealtimeError::StreamClosed);
            }

            let until = *deadline.get_or_insert_with(|| Instant::now().checked_add(timeout));
            match until {
                Some(until) => {
                    if self.condvar.wait_until(&mut state, until).timed_out() {
                        return match &state.value {
                            Some(value) => Ok(value.clone()),
                            None => Err(RealtimeError::HandshakeTimeout(timeout)),
                        };
                    }
                }
                None => self.condvar.wait(&mut state),
            }
        }
    }

    /// Close the gate. Pending and future waiters fail with `StreamClosed`
    /// unless a value was already delivered.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.condvar.notify_all();
    }

    pub fn peek(&self) -> Option<String> {
        self.state.lock().value.clone()
    }

    pub fn is_signaled(&self) -> bool {
        self.state.lock().value.is_some()
    }
}
