use std::sync::{Arc, Mutex};

use log::{error, trace, warn};

use uplink_shared::{
    hash_rage_string, info_value, strip_colors, AddressFamily, Clock, NetAddress, NetBuffer,
    MAX_INFO_STRING, MAX_OOB_SIZE, MSG_END, MSG_FRAME, MSG_ROUTE, NETWORK_PROTOCOL, OOB_MARKER,
};

use crate::channel::{ChannelIo, NetChannel};
use crate::config::EngineConfig;
use crate::events::{EngineEvents, Progress, StateChange};
use crate::game::GameInit;
use crate::handshake::{encode_auth_ticket, parse_init_response, InitDecision, InitHttpResult,
    InitRequestClient};
use crate::identity::IdentityProvider;
use crate::messages::{HandlerToken, ReliableHandlers, ReliableSender, LARGE_ID_BIT};
use crate::metrics::{MetricsSink, PacketMetrics, PacketSubComponent};
use crate::presence::PresenceSink;
use crate::routing::{IncomingQueue, OutgoingQueue, RoutingPacket};
use crate::transport::DatagramTransport;

use super::{ConnectionState, SessionContext};

const FRAME_BUFFER_CAPACITY: usize = 24000;

/// Queues shared with the game thread, lent to the engine for one tick.
pub(crate) struct FrameCtx<'a> {
    pub incoming: &'a IncomingQueue,
    pub outgoing: &'a OutgoingQueue,
}

/// Collaborators the engine is constructed over.
pub(crate) struct EngineDeps {
    pub transport: Box<dyn DatagramTransport>,
    pub http: Arc<dyn InitRequestClient>,
    pub identity: Arc<dyn IdentityProvider>,
    pub game_init: Arc<dyn GameInit>,
    pub metrics: Option<Box<dyn MetricsSink>>,
    pub presence: Option<Box<dyn PresenceSink>>,
    pub clock: Arc<dyn Clock>,
}

/// Lent to the channel for one send; carries no ownership of the engine.
struct EngineIo<'a> {
    transport: &'a mut dyn DatagramTransport,
    peer: NetAddress,
    clock: &'a dyn Clock,
}

impl ChannelIo for EngineIo<'_> {
    fn send(&mut self, data: &[u8]) {
        if let Err(err) = self.transport.send(&self.peer, data) {
            warn!("channel send failed: {}", err);
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

/// The connection state machine plus everything it owns: session context,
/// reliable stores, net channel, transport, and timers. Lives behind the
/// frame lock in [`crate::NetClient`]; every method here assumes that lock
/// is held.
pub(crate) struct ConnectionEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    transport: Box<dyn DatagramTransport>,
    http: Arc<dyn InitRequestClient>,
    identity: Arc<dyn IdentityProvider>,
    game_init: Arc<dyn GameInit>,
    metrics: Option<Box<dyn MetricsSink>>,
    presence: Option<Box<dyn PresenceSink>>,

    pub(crate) events: EngineEvents,

    channel: NetChannel,
    reliable: ReliableSender,
    handlers: ReliableHandlers,
    host_handoff_hash: u32,

    state: ConnectionState,
    last_state: ConnectionState,
    session: SessionContext,
    pending_init: Arc<Mutex<Option<InitHttpResult>>>,

    last_received_reliable_id: u32,
    last_frame_number: u32,
    // reserved for unreliable sequencing
    out_sequence: u32,
    server_base: u32,

    last_send: Option<u64>,
    last_connect: Option<u64>,
    connect_attempts: u32,
    last_received_at: u64,
    disconnect_reason: String,

    // survives sessions: joining a server in a different world requires a
    // restart once a game is loaded
    last_world: Option<String>,
    info_string: String,
    player_name_override: Option<String>,
}

impl ConnectionEngine {
    pub fn new(config: EngineConfig, deps: EngineDeps) -> Self {
        let player_name_override = config.player_name.clone();
        let max_reliable_commands = config.max_reliable_commands;

        Self {
            player_name_override,
            config,
            clock: deps.clock,
            transport: deps.transport,
            http: deps.http,
            identity: deps.identity,
            game_init: deps.game_init,
            metrics: deps.metrics,
            presence: deps.presence,
            events: EngineEvents::default(),
            channel: NetChannel::new(),
            reliable: ReliableSender::new(max_reliable_commands),
            handlers: ReliableHandlers::new(),
            host_handoff_hash: hash_rage_string("msgIHost"),
            state: ConnectionState::Idle,
            last_state: ConnectionState::Idle,
            session: SessionContext::default(),
            pending_init: Arc::new(Mutex::new(None)),
            last_received_reliable_id: 0,
            last_frame_number: 0,
            out_sequence: 0,
            server_base: 0,
            last_send: None,
            last_connect: None,
            connect_attempts: 0,
            last_received_at: 0,
            disconnect_reason: String::new(),
            last_world: None,
            info_string: String::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn server_net_id(&self) -> u16 {
        self.session.server_net_id
    }

    pub fn host_net_id(&self) -> u16 {
        self.session.host_net_id
    }

    pub fn host_base(&self) -> u32 {
        self.session.host_base
    }

    pub fn last_frame_number(&self) -> u32 {
        self.last_frame_number
    }

    /// Raw info string from the most recent `infoResponse`.
    pub fn info_string(&self) -> &str {
        &self.info_string
    }

    pub fn set_host(&mut self, net_id: u16, base: u32) {
        self.session.host_net_id = net_id;
        self.session.host_base = base;
    }

    pub fn set_base(&mut self, base: u32) {
        self.server_base = base;
    }

    pub fn set_player_name(&mut self, name: &str) {
        self.player_name_override = Some(name.to_string());
    }

    pub fn add_reliable_handler(
        &mut self,
        type_name: &str,
        handler: Box<dyn FnMut(&[u8]) + Send>,
    ) -> HandlerToken {
        self.handlers.add(type_name, handler)
    }

    pub fn remove_reliable_handler(&mut self, token: HandlerToken) {
        self.handlers.remove(token);
    }

    // ---- tick ----

    pub fn run_frame(&mut self, ctx: &FrameCtx) {
        self.apply_pending_init();

        if self.state != self.last_state {
            let mut change = StateChange {
                new: self.state,
                old: self.last_state,
            };
            self.last_state = self.state;
            self.events.state_changed.emit(&mut change);
        }

        self.process_packets(ctx);
        self.process_send(ctx);

        match self.state {
            ConnectionState::InitReceived => {
                self.state = ConnectionState::Downloading;

                self.emit_progress("Downloading content", 0, 1);
                if let Some(server) = self.session.current_server {
                    let mut arg = server;
                    self.events.init_received.emit(&mut arg);
                }
            }

            ConnectionState::DownloadComplete => {
                self.state = ConnectionState::Fetching;
                self.last_connect = None;
                self.connect_attempts = 0;

                self.emit_progress("Downloading completed", 1, 1);
            }

            ConnectionState::Fetching => {
                if self.handshake_poll_due() {
                    if let Some(server) = self.session.current_server {
                        self.send_out_of_band(server, "getinfo xyz");
                    }
                    self.register_handshake_attempt("Fetching info from server...");
                }

                if self.connect_attempts > self.config.max_handshake_attempts {
                    self.disconnect_reason = "Fetching info timed out.".to_string();
                    self.finalize_disconnect(ctx);

                    self.events.connection_timed_out.emit(&mut ());

                    self.global_error(&format!(
                        "Failed to getinfo server after {} attempts.",
                        self.config.max_handshake_attempts
                    ));
                }
            }

            ConnectionState::Connecting => {
                if self.handshake_poll_due() {
                    if let Some(server) = self.session.current_server {
                        let request = format!(
                            "connect token={}&guid={}",
                            self.session.token,
                            self.identity.guid()
                        );
                        self.send_out_of_band(server, &request);
                    }
                    self.register_handshake_attempt("Connecting to server...");
                }

                if self.connect_attempts > self.config.max_handshake_attempts {
                    self.disconnect_reason = "Connection timed out.".to_string();
                    self.finalize_disconnect(ctx);

                    self.events.connection_timed_out.emit(&mut ());

                    self.global_error(&format!(
                        "Failed to connect to server after {} attempts.",
                        self.config.max_handshake_attempts
                    ));
                }
            }

            ConnectionState::Active => {
                let now = self.clock.now_ms();
                let timeout_ms = self.config.active_timeout.as_millis() as u64;

                if now.saturating_sub(self.last_received_at) > timeout_ms {
                    self.disconnect_reason = "Connection timed out.".to_string();
                    self.finalize_disconnect(ctx);

                    self.events.connection_timed_out.emit(&mut ());

                    self.global_error(&format!(
                        "Server connection timed out after {} seconds.",
                        self.config.active_timeout.as_secs()
                    ));
                }
            }

            _ => {}
        }

        self.flush_route_delays(ctx);
    }

    fn handshake_poll_due(&self) -> bool {
        let retry_ms = self.config.handshake_retry_interval.as_millis() as u64;
        let now = self.clock.now_ms();
        self.last_connect
            .map_or(true, |last| now.saturating_sub(last) > retry_ms)
    }

    fn register_handshake_attempt(&mut self, message: &str) {
        self.last_connect = Some(self.clock.now_ms());
        self.connect_attempts += 1;

        let spec_status = if self.connect_attempts > 1 {
            format!(" (attempt {})", self.connect_attempts)
        } else {
            String::new()
        };
        self.emit_progress(&format!("{}{}", message, spec_status), 1, 1);
    }

    fn emit_progress(&mut self, message: &str, done: u32, total: u32) {
        let mut progress = Progress {
            message: message.to_string(),
            done,
            total,
        };
        self.events.connection_progress.emit(&mut progress);
    }

    // ---- handshake ----

    pub fn connect(&mut self, ctx: &FrameCtx, host: &str, port: u16) {
        if self.state != ConnectionState::Idle {
            self.disconnect(ctx, "Connecting to another server.");
        }

        let server = match NetAddress::resolve(host, port) {
            Ok(server) => server,
            Err(err) => {
                let mut message = err.to_string();
                self.events.connection_error.emit(&mut message);
                return;
            }
        };

        self.session = SessionContext {
            current_server: Some(server),
            ..SessionContext::default()
        };
        self.reliable.reset();
        self.last_received_reliable_id = 0;
        self.last_frame_number = 0;
        self.out_sequence = 0;
        self.state = ConnectionState::Initing;

        let mut fields = vec![
            ("method".to_string(), "initConnect".to_string()),
            ("name".to_string(), self.player_name()),
            ("protocol".to_string(), NETWORK_PROTOCOL.to_string()),
        ];
        if let Some(ticket) = self.identity.auth_ticket() {
            fields.push(("authTicket".to_string(), encode_auth_ticket(&ticket)));
        }
        fields.push(("guid".to_string(), self.identity.guid().to_string()));

        let slot = Arc::clone(&self.pending_init);
        *slot.lock().unwrap() = None;

        self.http.post_init(
            host,
            port,
            fields,
            Box::new(move |result| {
                *slot.lock().unwrap() = Some(result);
            }),
        );
    }

    fn player_name(&self) -> String {
        self.player_name_override
            .clone()
            .or_else(|| self.identity.player_name())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Applies the handshake outcome queued by the HTTP completion callback.
    fn apply_pending_init(&mut self) {
        let Some(outcome) = self.pending_init.lock().unwrap().take() else {
            return;
        };
        if self.state != ConnectionState::Initing {
            return;
        }

        match outcome {
            Err(detail) => {
                let server = self
                    .session
                    .current_server
                    .map(|server| server.to_string())
                    .unwrap_or_default();
                let suffix = if detail.is_empty() {
                    String::new()
                } else {
                    format!(" - {}", detail)
                };

                self.state = ConnectionState::Idle;
                let mut message = format!("Failed handshake to server {}{}.", server, suffix);
                self.events.connection_error.emit(&mut message);
            }

            Ok(body) => match parse_init_response(&body) {
                InitDecision::Reject { message } => {
                    self.state = ConnectionState::Idle;
                    let mut message = message;
                    self.events.connection_error.emit(&mut message);
                }

                InitDecision::Accept {
                    token,
                    protocol,
                    scripthook_allowed,
                    enhanced_host_support,
                } => {
                    self.session.token = token;
                    self.session.server_protocol = protocol;
                    self.session.scripthook_allowed = scripthook_allowed;
                    self.session.enhanced_host_support = enhanced_host_support;

                    if let Some(server) = self.session.current_server {
                        if let Some(presence) = self.presence.as_deref_mut() {
                            presence.set_connect_value(&format!("+connect {}", server));
                        }
                    }

                    self.state = ConnectionState::InitReceived;
                }
            },
        }
    }

    pub fn downloads_complete(&mut self) {
        if self.state == ConnectionState::Downloading {
            self.state = ConnectionState::DownloadComplete;
        }
    }

    // ---- disconnect ----

    pub fn disconnect(&mut self, ctx: &FrameCtx, reason: &str) {
        if self.state == ConnectionState::Idle {
            return;
        }

        self.disconnect_reason = reason.to_string();
        let mut arg = reason.to_string();
        self.events.attempt_disconnect.emit(&mut arg);

        self.finalize_disconnect(ctx);
    }

    pub fn finalize_disconnect(&mut self, ctx: &FrameCtx) {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Active
        ) {
            let mut payload = self.disconnect_reason.clone().into_bytes();
            payload.push(0);
            self.send_reliable_command("msgIQuit", payload);

            // the quit frame goes out twice; losses here are unrecoverable
            self.last_send = None;
            self.process_send(ctx);
            self.last_send = None;
            self.process_send(ctx);
        }

        if self.state != ConnectionState::Idle {
            if let Some(server) = self.session.current_server {
                let mut arg = server;
                self.events.finalize_disconnect.emit(&mut arg);
            }

            ctx.incoming.clear();
            ctx.outgoing.clear();
            self.reliable.reset();
            self.last_received_reliable_id = 0;
            self.channel = NetChannel::new();
            self.session = SessionContext::default();
            self.state = ConnectionState::Idle;
        }
    }

    /// Error surfaced by the game-init collaborator.
    pub fn report_game_error(&mut self, ctx: &FrameCtx, message: &str) {
        if self.state != ConnectionState::Active {
            let mut arg = message.to_string();
            self.events.connection_error.emit(&mut arg);
            self.state = ConnectionState::Idle;
        } else {
            let first_line = message.lines().next().unwrap_or("");
            let clipped: String = first_line.chars().take(100).collect();
            self.disconnect(ctx, &clipped);
        }
    }

    fn global_error(&mut self, message: &str) {
        error!("{}", message);
        let mut arg = message.to_string();
        self.events.global_error.emit(&mut arg);
    }

    // ---- receive path ----

    pub fn process_packets(&mut self, ctx: &FrameCtx) {
        for family in [AddressFamily::V4, AddressFamily::V6] {
            while let Some((data, from)) = self.transport.try_recv(family) {
                self.handle_datagram(ctx, &data, from);
            }
        }
    }

    fn handle_datagram(&mut self, ctx: &FrameCtx, data: &[u8], from: NetAddress) {
        if data.len() >= 4
            && u32::from_le_bytes([data[0], data[1], data[2], data[3]]) == OOB_MARKER
        {
            let text = String::from_utf8_lossy(&data[4..]).into_owned();
            self.process_oob(from, &text);
            return;
        }

        let Some(server) = self.session.current_server else {
            trace!("in-channel datagram without a session");
            return;
        };
        if from != server {
            trace!("invalid from address for server message");
            return;
        }

        if let Some(mut msg) = self.channel.process(data) {
            self.process_server_message(ctx, &mut msg);
        }
    }

    fn process_oob(&mut self, from: NetAddress, oob: &str) {
        if self.session.current_server != Some(from) {
            trace!("out-of-band message from a non-server address");
            return;
        }

        if starts_with_command(oob, "infoResponse") {
            self.process_info_response(oob);
        } else if starts_with_command(oob, "connectOK") {
            self.process_connect_ok(oob);
        } else if starts_with_command(oob, "error") {
            if oob.len() >= 6 {
                let message = oob.get(6..).unwrap_or("").to_string();
                self.global_error(&message);
            }
        }
    }

    fn process_info_response(&mut self, oob: &str) {
        let info = oob.get(13..).unwrap_or("").to_string();
        if info.len() >= MAX_INFO_STRING {
            trace!("oversized info string ({} bytes)", info.len());
            return;
        }

        self.info_string = info.clone();

        if let Some(presence) = self.presence.as_deref_mut() {
            let hostname = info_value(&info, "hostname").unwrap_or_default();
            let cleaned: String = strip_colors(&hostname).chars().take(64).collect();

            presence.set_template("{0}\n\n{2} on {3} with {1}");
            presence.set_value(0, &format!("{}...", cleaned));
            presence.set_value(1, "Connecting...");
            presence.set_value(2, &info_value(&info, "gametype").unwrap_or_default());
            presence.set_value(3, &info_value(&info, "mapname").unwrap_or_default());
        }

        let world = info_value(&info, "world")
            .filter(|world| !world.is_empty())
            .unwrap_or_else(|| self.config.default_world.clone());

        if let Some(last_world) = &self.last_world {
            if *last_world != world && self.game_init.is_game_loaded() {
                let message = format!(
                    "Was loaded in world {}, but this server is world {}. Restart the game to join.",
                    last_world, world
                );
                self.global_error(&message);
                return;
            }
        }
        self.last_world = Some(world);

        if self.state == ConnectionState::Fetching {
            self.state = ConnectionState::Connecting;
            self.last_connect = None;
            self.connect_attempts = 0;
        }
    }

    fn process_connect_ok(&mut self, oob: &str) {
        let Some(rest) = oob.get(10..) else {
            trace!("truncated connectOK");
            return;
        };

        let mut parts = rest.split(' ');
        let parsed = (|| {
            let client_net_id = parts.next()?.parse::<u16>().ok()?;
            let host_net_id = parts.next()?.parse::<u16>().ok()?;
            let host_base = parts.next()?.parse::<u32>().ok()?;
            Some((client_net_id, host_net_id, host_base))
        })();

        let Some((client_net_id, host_net_id, host_base)) = parsed else {
            trace!("malformed connectOK: {:?}", rest);
            return;
        };

        self.session.server_net_id = client_net_id;
        self.session.host_net_id = host_net_id;
        self.session.host_base = host_base;
        self.last_received_reliable_id = 0;

        trace!(
            "connectOK, our id {}, host id {}",
            client_net_id,
            host_net_id
        );

        let Some(server) = self.session.current_server else {
            return;
        };

        let mut arg = server;
        self.events.connect_ok_received.emit(&mut arg);

        self.channel.reset(server);
        self.state = ConnectionState::Connected;
    }

    fn process_server_message(&mut self, ctx: &FrameCtx, msg: &mut NetBuffer) {
        self.last_received_at = self.clock.now_ms();

        let mut metrics = PacketMetrics::new();

        let ack = msg.read_u32();
        if msg.exhausted() {
            return;
        }
        self.reliable.ack(ack);

        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Active;
        }
        if self.state != ConnectionState::Active {
            return;
        }

        loop {
            if msg.end() {
                break;
            }

            let msg_type = msg.read_u32();
            if msg.exhausted() || msg_type == MSG_END {
                break;
            }

            if msg_type == MSG_ROUTE {
                let net_id = msg.read_u16();
                let length = msg.read_u16() as usize;
                if msg.exhausted() {
                    break;
                }

                let Some(payload) = msg.read_bytes(length) else {
                    break;
                };

                ctx.incoming.enqueue(RoutingPacket {
                    net_id,
                    payload,
                    gen_time: self.clock.now_ms(),
                });

                metrics.add_element_size(PacketSubComponent::RoutedMessages, 2 + length);
            } else if msg_type == MSG_FRAME {
                let frame_number = msg.read_u32();
                if msg.exhausted() {
                    break;
                }
                self.last_frame_number = frame_number;

                if self.session.server_protocol >= 3 {
                    let ping = msg.read_i32();
                    if msg.exhausted() {
                        break;
                    }
                    if let Some(sink) = self.metrics.as_deref_mut() {
                        sink.on_ping_result(ping);
                    }
                }
            } else {
                // anything else is a reliable command keyed by type hash
                let raw_id = msg.read_u32();
                let (id, size) = if raw_id & LARGE_ID_BIT != 0 {
                    metrics.add_element_size(PacketSubComponent::ReliableMessages, 4);
                    (raw_id & !LARGE_ID_BIT, msg.read_u32() as usize)
                } else {
                    metrics.add_element_size(PacketSubComponent::ReliableMessages, 2);
                    (raw_id, msg.read_u16() as usize)
                };
                if msg.exhausted() {
                    break;
                }

                if id > self.last_received_reliable_id.saturating_add(64) {
                    trace!(
                        "reliable id {} too far ahead of {}, dropping datagram",
                        id,
                        self.last_received_reliable_id
                    );
                    return;
                }

                let Some(payload) = msg.read_bytes(size) else {
                    break;
                };

                if id > self.last_received_reliable_id {
                    self.handle_reliable_command(msg_type, &payload);
                    self.last_received_reliable_id = id;
                }

                metrics.add_element_size(PacketSubComponent::ReliableMessages, 4 + size);
            }
        }

        if let Some(sink) = self.metrics.as_deref_mut() {
            sink.on_incoming_packet(&metrics);
        }
    }

    fn handle_reliable_command(&mut self, type_hash: u32, payload: &[u8]) {
        if type_hash == self.host_handoff_hash {
            let mut buf = NetBuffer::from_bytes(payload);
            let host_net_id = buf.read_u16();
            let host_base = buf.read_u32();
            if !buf.exhausted() {
                self.set_host(host_net_id, host_base);
            }
        }

        self.handlers.dispatch(type_hash, payload);
    }

    // ---- send path ----

    pub fn process_send(&mut self, ctx: &FrameCtx) {
        let now = self.clock.now_ms();
        let interval_ms = self.config.send_interval.as_millis() as u64;

        let due = self
            .last_send
            .map_or(true, |last| now.saturating_sub(last) >= interval_ms);
        if !due {
            return;
        }

        if self.state != ConnectionState::Active {
            return;
        }
        let Some(peer) = self.session.current_server else {
            return;
        };

        let mut metrics = PacketMetrics::new();
        let mut msg = NetBuffer::with_capacity(FRAME_BUFFER_CAPACITY);

        msg.write_u32(self.last_received_reliable_id);

        if self.session.server_protocol >= 2 {
            msg.write_u32(self.last_frame_number);
        }

        while let Some(packet) = ctx.outgoing.try_pop() {
            msg.write_u32(MSG_ROUTE);
            msg.write_u16(packet.net_id);
            msg.write_u16(packet.payload.len() as u16);
            msg.write_bytes(&packet.payload);

            metrics.add_element_size(
                PacketSubComponent::RoutedMessages,
                packet.payload.len() + 2 + 2 + 4,
            );
        }

        self.reliable.write_into(&mut msg, &mut metrics);

        self.events.build_message.emit(&mut msg);

        msg.write_u32(MSG_END);

        let mut io = EngineIo {
            transport: self.transport.as_mut(),
            peer,
            clock: &*self.clock,
        };
        self.channel.send(&mut io, &msg);

        self.last_send = Some(now);

        if let Some(sink) = self.metrics.as_deref_mut() {
            sink.on_outgoing_packet(&metrics);
        }
    }

    pub fn send_reliable_command(&mut self, type_name: &str, payload: Vec<u8>) {
        if let Err(err) = self.reliable.push(type_name, payload) {
            let message = err.to_string();
            self.global_error(&message);
        }
    }

    pub fn send_net_event(&mut self, event_name: &str, json: &str, target: i32) {
        let mut cmd_type = "msgNetEvent";
        let mut target = target;

        if target == -1 {
            target = i32::from(u16::MAX);
        } else if target == -2 {
            cmd_type = "msgServerEvent";
        }

        let mut buffer = NetBuffer::with_capacity(event_name.len() + json.len() + 8);

        if target >= 0 {
            buffer.write_u16(target as u16);
        }

        buffer.write_u16((event_name.len() + 1) as u16);
        buffer.write_bytes(event_name.as_bytes());
        buffer.write_u8(0);

        buffer.write_bytes(json.as_bytes());

        let payload = buffer.bytes().to_vec();
        self.send_reliable_command(cmd_type, payload);
    }

    fn send_out_of_band(&mut self, addr: NetAddress, text: &str) {
        if 4 + text.len() > MAX_OOB_SIZE {
            self.global_error("Attempted to overrun the out-of-band send buffer.");
            return;
        }

        let mut data = Vec::with_capacity(4 + text.len());
        data.extend_from_slice(&OOB_MARKER.to_le_bytes());
        data.extend_from_slice(text.as_bytes());

        if let Err(err) = self.transport.send(&addr, &data) {
            warn!("out-of-band send failed: {}", err);
        }
    }

    fn flush_route_delays(&mut self, ctx: &FrameCtx) {
        let delays = ctx.incoming.take_delays();
        if let Some(sink) = self.metrics.as_deref_mut() {
            for delay in delays {
                sink.on_route_delay_result(delay);
            }
        }
    }
}

/// Case-insensitive OOB command prefix check.
fn starts_with_command(oob: &str, command: &str) -> bool {
    oob.get(..command.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(command))
}
