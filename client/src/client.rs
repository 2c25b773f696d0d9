use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use uplink_shared::Clock;

use crate::config::EngineConfig;
use crate::connection::{ConnectionEngine, ConnectionState, EngineDeps, FrameCtx, SessionContext};
use crate::events::EngineEvents;
use crate::game::GameInit;
use crate::handshake::InitRequestClient;
use crate::identity::IdentityProvider;
use crate::messages::HandlerToken;
use crate::metrics::MetricsSink;
use crate::presence::PresenceSink;
use crate::routing::{IncomingQueue, OutgoingQueue};
use crate::transport::DatagramTransport;

/// Collaborators the engine is built over. Every external system the engine
/// talks to enters through here.
pub struct ClientDeps {
    pub transport: Box<dyn DatagramTransport>,
    pub http: Arc<dyn InitRequestClient>,
    pub identity: Arc<dyn IdentityProvider>,
    pub game_init: Arc<dyn GameInit>,
    pub metrics: Option<Box<dyn MetricsSink>>,
    pub presence: Option<Box<dyn PresenceSink>>,
    pub clock: Arc<dyn Clock>,
}

/// The client-side network engine: one long-lived instance per process.
///
/// The tick (`run_frame`) and the native-net hooks contend on a single frame
/// lock via `try_lock`; whichever loses the race skips that invocation, so
/// the tick never overlaps itself. Game-thread routing APIs
/// (`route_packet`, `wait_for_routed_packet`, `dequeue_routed_packet`) stay
/// off that lock entirely.
pub struct NetClient {
    engine: Mutex<ConnectionEngine>,
    suspended: AtomicBool,
    incoming: IncomingQueue,
    outgoing: OutgoingQueue,
    clock: Arc<dyn Clock>,
}

impl NetClient {
    pub fn create(config: EngineConfig, deps: ClientDeps) -> Self {
        let clock = Arc::clone(&deps.clock);

        let engine = ConnectionEngine::new(
            config,
            EngineDeps {
                transport: deps.transport,
                http: deps.http,
                identity: deps.identity,
                game_init: deps.game_init,
                metrics: deps.metrics,
                presence: deps.presence,
                clock: deps.clock,
            },
        );

        Self {
            engine: Mutex::new(engine),
            suspended: AtomicBool::new(false),
            incoming: IncomingQueue::new(),
            outgoing: OutgoingQueue::new(),
            clock,
        }
    }

    /// Like [`NetClient::create`], but hands the fresh instance to `setup`
    /// before any frame can run — the place to register event observers and
    /// reliable handlers.
    pub fn create_with(
        config: EngineConfig,
        deps: ClientDeps,
        setup: impl FnOnce(&Self),
    ) -> Self {
        let client = Self::create(config, deps);
        setup(&client);
        client
    }

    fn ctx(&self) -> FrameCtx<'_> {
        FrameCtx {
            incoming: &self.incoming,
            outgoing: &self.outgoing,
        }
    }

    fn engine(&self) -> MutexGuard<'_, ConnectionEngine> {
        self.engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_engine(&self) -> Option<MutexGuard<'_, ConnectionEngine>> {
        match self.engine.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    // ---- tick ----

    /// One engine tick. Skipped entirely when frames are suspended or the
    /// frame lock is contended.
    pub fn run_frame(&self) {
        if self.suspended.load(Ordering::Relaxed) {
            return;
        }
        let Some(mut engine) = self.try_engine() else {
            return;
        };
        engine.run_frame(&self.ctx());
    }

    /// Receive-only half of the tick, for the native-net callback.
    pub fn pre_process_native_net(&self) {
        if self.suspended.load(Ordering::Relaxed) {
            return;
        }
        let Some(mut engine) = self.try_engine() else {
            return;
        };
        engine.process_packets(&self.ctx());
    }

    /// Send-only half of the tick, for the native-net callback.
    pub fn post_process_native_net(&self) {
        if self.suspended.load(Ordering::Relaxed) {
            return;
        }
        let Some(mut engine) = self.try_engine() else {
            return;
        };
        engine.process_send(&self.ctx());
    }

    /// Ticks the engine through a pre-game frame. Returns `false` while a
    /// handshake is still in flight (the game should not advance).
    pub fn process_pre_game_tick(&self) -> bool {
        let mid_handshake = self.connection_state().is_mid_handshake();
        if mid_handshake {
            self.run_frame();
        }
        !mid_handshake
    }

    /// Stops frames from running until [`NetClient::resume_frames`]. Used by
    /// host integrations that must reenter the embedding game while a tick
    /// would otherwise fire.
    pub fn suspend_frames(&self) {
        self.suspended.store(true, Ordering::Relaxed);
    }

    pub fn resume_frames(&self) {
        self.suspended.store(false, Ordering::Relaxed);
    }

    // ---- lifecycle ----

    pub fn connect(&self, host: &str, port: u16) {
        self.engine().connect(&self.ctx(), host, port);
    }

    pub fn disconnect(&self, reason: &str) {
        self.engine().disconnect(&self.ctx(), reason);
    }

    pub fn downloads_complete(&self) {
        self.engine().downloads_complete();
    }

    /// Error surfaced by the game-init collaborator; wired explicitly
    /// instead of through hidden registration.
    pub fn report_game_error(&self, message: &str) {
        self.engine().report_game_error(&self.ctx(), message);
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.engine().state()
    }

    pub fn session(&self) -> SessionContext {
        self.engine().session().clone()
    }

    pub fn server_net_id(&self) -> u16 {
        self.engine().server_net_id()
    }

    pub fn host_net_id(&self) -> u16 {
        self.engine().host_net_id()
    }

    pub fn host_base(&self) -> u32 {
        self.engine().host_base()
    }

    pub fn set_host(&self, net_id: u16, base: u32) {
        self.engine().set_host(net_id, base);
    }

    pub fn set_base(&self, base: u32) {
        self.engine().set_base(base);
    }

    pub fn set_player_name(&self, name: &str) {
        self.engine().set_player_name(name);
    }

    /// Raw info string from the most recent `infoResponse`.
    pub fn server_info_string(&self) -> String {
        self.engine().info_string().to_string()
    }

    /// Registers observers for connection-lifecycle events.
    pub fn with_events<R>(&self, f: impl FnOnce(&mut EngineEvents) -> R) -> R {
        f(&mut self.engine().events)
    }

    // ---- messaging ----

    pub fn send_reliable_command(&self, type_name: &str, payload: &[u8]) {
        self.engine()
            .send_reliable_command(type_name, payload.to_vec());
    }

    pub fn send_net_event(&self, event_name: &str, json: &str, target: i32) {
        self.engine().send_net_event(event_name, json, target);
    }

    pub fn add_reliable_handler(
        &self,
        type_name: &str,
        handler: Box<dyn FnMut(&[u8]) + Send>,
    ) -> HandlerToken {
        self.engine().add_reliable_handler(type_name, handler)
    }

    pub fn remove_reliable_handler(&self, token: HandlerToken) {
        self.engine().remove_reliable_handler(token);
    }

    // ---- routing (game thread) ----

    /// Queues a per-entity payload for the next outbound frame. Safe from
    /// any thread.
    pub fn route_packet(&self, net_id: u16, payload: &[u8]) {
        self.outgoing.push(net_id, payload.to_vec());
    }

    /// Blocks until a routed packet arrives or `timeout` elapses.
    pub fn wait_for_routed_packet(&self, timeout: Duration) -> bool {
        self.incoming.wait_for_packet(timeout)
    }

    pub fn dequeue_routed_packet(&self) -> Option<(u16, Vec<u8>)> {
        self.incoming.dequeue(self.clock.now_ms())
    }
}
