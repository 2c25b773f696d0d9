use uplink_shared::{NetAddress, NetBuffer};

use crate::connection::ConnectionState;

/// Stable deregistration token for an event callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventToken(u64);

/// Append-only list of `(token, callback)` pairs.
///
/// Callbacks run in registration order. They are invoked under the frame
/// lock and MUST NOT call back into the engine; consumers needing engine
/// access queue work for their own thread instead.
pub struct EventDispatcher<A: ?Sized> {
    next_token: u64,
    callbacks: Vec<(EventToken, Box<dyn FnMut(&mut A) + Send>)>,
}

impl<A: ?Sized> EventDispatcher<A> {
    pub fn new() -> Self {
        Self {
            next_token: 0,
            callbacks: Vec::new(),
        }
    }

    pub fn connect(&mut self, callback: Box<dyn FnMut(&mut A) + Send>) -> EventToken {
        self.next_token += 1;
        let token = EventToken(self.next_token);
        self.callbacks.push((token, callback));
        token
    }

    pub fn disconnect(&mut self, token: EventToken) {
        self.callbacks.retain(|(candidate, _)| *candidate != token);
    }

    pub fn emit(&mut self, arg: &mut A) {
        for (_, callback) in self.callbacks.iter_mut() {
            callback(arg);
        }
    }
}

impl<A: ?Sized> Default for EventDispatcher<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Argument of [`EngineEvents::state_changed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChange {
    pub new: ConnectionState,
    pub old: ConnectionState,
}

/// Argument of [`EngineEvents::connection_progress`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub message: String,
    pub done: u32,
    pub total: u32,
}

/// Every connection-lifecycle event the engine emits.
///
/// Observers are wired at creation time through
/// [`crate::NetClient::create_with`], which hands the fresh instance to the
/// caller before any frame runs.
#[derive(Default)]
pub struct EngineEvents {
    pub state_changed: EventDispatcher<StateChange>,
    pub connection_progress: EventDispatcher<Progress>,
    pub connection_error: EventDispatcher<String>,
    pub connection_timed_out: EventDispatcher<()>,
    pub connect_ok_received: EventDispatcher<NetAddress>,
    pub init_received: EventDispatcher<NetAddress>,
    pub attempt_disconnect: EventDispatcher<String>,
    pub finalize_disconnect: EventDispatcher<NetAddress>,
    pub build_message: EventDispatcher<NetBuffer>,
    pub global_error: EventDispatcher<String>,
}
