use std::collections::HashMap;

use uplink_shared::hash_rage_string;

/// Stable deregistration token for a reliable-command handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerToken(u64);

type Handler = Box<dyn FnMut(&[u8]) + Send>;

/// Multimap of reliable-command handlers keyed by type hash.
///
/// All handlers registered for a hash run, in registration order, for every
/// fresh inbound command of that type. Handlers are invoked under the frame
/// lock and must not call back into the engine.
pub struct ReliableHandlers {
    next_token: u64,
    handlers: HashMap<u32, Vec<(HandlerToken, Handler)>>,
}

impl ReliableHandlers {
    pub fn new() -> Self {
        Self {
            next_token: 0,
            handlers: HashMap::new(),
        }
    }

    pub fn add(&mut self, type_name: &str, handler: Handler) -> HandlerToken {
        self.next_token += 1;
        let token = HandlerToken(self.next_token);

        self.handlers
            .entry(hash_rage_string(type_name))
            .or_default()
            .push((token, handler));

        token
    }

    pub fn remove(&mut self, token: HandlerToken) {
        for handlers in self.handlers.values_mut() {
            handlers.retain(|(candidate, _)| *candidate != token);
        }
    }

    pub fn dispatch(&mut self, type_hash: u32, payload: &[u8]) {
        if let Some(handlers) = self.handlers.get_mut(&type_hash) {
            for (_, handler) in handlers.iter_mut() {
                handler(payload);
            }
        }
    }
}

impl Default for ReliableHandlers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn all_matching_handlers_run_in_order() {
        let mut handlers = ReliableHandlers::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let calls = Arc::clone(&calls);
            handlers.add(
                "msgNetEvent",
                Box::new(move |payload| {
                    calls.lock().unwrap().push((tag, payload.to_vec()));
                }),
            );
        }

        handlers.dispatch(hash_rage_string("msgNetEvent"), &[0x01]);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ("first", vec![0x01]));
        assert_eq!(calls[1], ("second", vec![0x01]));
    }

    #[test]
    fn unknown_hash_dispatches_nothing() {
        let mut handlers = ReliableHandlers::new();
        handlers.add("msgNetEvent", Box::new(|_| panic!("should not run")));
        handlers.dispatch(0xDEAD_BEEF, &[]);
    }

    #[test]
    fn removed_handler_stops_running() {
        let mut handlers = ReliableHandlers::new();
        let count = Arc::new(Mutex::new(0));

        let token = {
            let count = Arc::clone(&count);
            handlers.add(
                "msgNetEvent",
                Box::new(move |_| {
                    *count.lock().unwrap() += 1;
                }),
            )
        };

        handlers.dispatch(hash_rage_string("msgNetEvent"), &[]);
        handlers.remove(token);
        handlers.dispatch(hash_rage_string("msgNetEvent"), &[]);

        assert_eq!(*count.lock().unwrap(), 1);
    }
}
