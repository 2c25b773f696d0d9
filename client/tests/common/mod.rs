//! Shared fixtures: a manually advanced clock, stub collaborators, and a
//! harness that wires an engine to an in-memory transport.

#![allow(dead_code)]

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use uplink_client::transport::{PacketChannel, PacketChannelRemote};
use uplink_client::{
    ClientDeps, ConnectionState, EngineConfig, GameInit, IdentityProvider, InitHttpResult,
    InitRequestClient, NetClient,
};
use uplink_shared::{Clock, NetAddress, NetBuffer, OOB_MARKER};

pub const SERVER_HOST: &str = "203.0.113.5";
pub const SERVER_PORT: u16 = 30120;
pub const GUID: u64 = 76561198000000000;

pub fn server_addr() -> NetAddress {
    NetAddress::V4(Ipv4Addr::new(203, 0, 113, 5), SERVER_PORT)
}

pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub struct StubHttp {
    pub response: Mutex<Option<InitHttpResult>>,
    pub requests: Mutex<Vec<(String, u16, Vec<(String, String)>)>>,
}

impl StubHttp {
    pub fn with_response(response: InitHttpResult) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Some(response)),
            requests: Mutex::new(Vec::new()),
        })
    }
}

impl InitRequestClient for StubHttp {
    fn post_init(
        &self,
        host: &str,
        port: u16,
        fields: Vec<(String, String)>,
        done: uplink_client::InitCompletion,
    ) {
        self.requests
            .lock()
            .unwrap()
            .push((host.to_string(), port, fields));

        if let Some(response) = self.response.lock().unwrap().clone() {
            done(response);
        }
    }
}

pub struct StubIdentity;

impl IdentityProvider for StubIdentity {
    fn guid(&self) -> u64 {
        GUID
    }

    fn player_name(&self) -> Option<String> {
        Some("tester".to_string())
    }
}

pub struct StubGame {
    pub loaded: std::sync::atomic::AtomicBool,
}

impl StubGame {
    pub fn new(loaded: bool) -> Arc<Self> {
        Arc::new(Self {
            loaded: std::sync::atomic::AtomicBool::new(loaded),
        })
    }
}

impl GameInit for StubGame {
    fn is_game_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }
}

/// Event trails collected through the observer registrations.
#[derive(Clone, Default)]
pub struct EventLog {
    pub states: Arc<Mutex<Vec<(ConnectionState, ConnectionState)>>>,
    pub progress: Arc<Mutex<Vec<String>>>,
    pub errors: Arc<Mutex<Vec<String>>>,
    pub timeouts: Arc<Mutex<u32>>,
    pub global_errors: Arc<Mutex<Vec<String>>>,
    pub connect_oks: Arc<Mutex<Vec<NetAddress>>>,
    pub finalized: Arc<Mutex<Vec<NetAddress>>>,
}

pub struct Harness {
    pub client: NetClient,
    pub remote: PacketChannelRemote,
    pub clock: Arc<ManualClock>,
    pub http: Arc<StubHttp>,
    pub game: Arc<StubGame>,
    pub log: EventLog,
    server_sequence: AtomicU32,
}

impl Harness {
    pub fn new(http: Arc<StubHttp>) -> Self {
        Self::with_game(http, StubGame::new(false))
    }

    pub fn with_game(http: Arc<StubHttp>, game: Arc<StubGame>) -> Self {
        let (transport, remote) = PacketChannel::unbounded();
        let clock = Arc::new(ManualClock::new());
        let log = EventLog::default();

        let deps = ClientDeps {
            transport: Box::new(transport),
            http: Arc::clone(&http) as Arc<dyn InitRequestClient>,
            identity: Arc::new(StubIdentity),
            game_init: Arc::clone(&game) as Arc<dyn GameInit>,
            metrics: None,
            presence: None,
            clock: Arc::clone(&clock) as Arc<dyn Clock>,
        };

        let observed = log.clone();
        let client = NetClient::create_with(EngineConfig::default(), deps, |client| {
            client.with_events(|events| {
                let states = Arc::clone(&observed.states);
                events.state_changed.connect(Box::new(move |change| {
                    states.lock().unwrap().push((change.new, change.old));
                }));

                let progress = Arc::clone(&observed.progress);
                events.connection_progress.connect(Box::new(move |update| {
                    progress.lock().unwrap().push(update.message.clone());
                }));

                let errors = Arc::clone(&observed.errors);
                events.connection_error.connect(Box::new(move |message| {
                    errors.lock().unwrap().push(message.clone());
                }));

                let timeouts = Arc::clone(&observed.timeouts);
                events.connection_timed_out.connect(Box::new(move |_| {
                    *timeouts.lock().unwrap() += 1;
                }));

                let global_errors = Arc::clone(&observed.global_errors);
                events.global_error.connect(Box::new(move |message| {
                    global_errors.lock().unwrap().push(message.clone());
                }));

                let connect_oks = Arc::clone(&observed.connect_oks);
                events.connect_ok_received.connect(Box::new(move |addr| {
                    connect_oks.lock().unwrap().push(*addr);
                }));

                let finalized = Arc::clone(&observed.finalized);
                events.finalize_disconnect.connect(Box::new(move |addr| {
                    finalized.lock().unwrap().push(*addr);
                }));
            });
        });

        Self {
            client,
            remote,
            clock,
            http,
            game,
            log,
            server_sequence: AtomicU32::new(0),
        }
    }

    pub fn connect(&self) {
        self.client.connect(SERVER_HOST, SERVER_PORT);
    }

    pub fn tick(&self) {
        self.client.run_frame();
    }

    /// Injects an out-of-band command as the server.
    pub fn inject_oob(&self, text: &str) {
        let mut data = OOB_MARKER.to_le_bytes().to_vec();
        data.extend_from_slice(text.as_bytes());
        self.remote.inject(server_addr(), &data);
    }

    /// Injects an in-channel datagram as the server, prefixing the channel
    /// sequence.
    pub fn inject_channel(&self, body: &[u8]) {
        let sequence = self.server_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let mut data = sequence.to_le_bytes().to_vec();
        data.extend_from_slice(body);
        self.remote.inject(server_addr(), &data);
    }

    /// Matches the channel reset the engine performs on `connectOK`.
    pub fn reset_server_sequence(&self) {
        self.server_sequence.store(0, Ordering::SeqCst);
    }

    /// Everything the engine sent, split into OOB strings and channel
    /// payloads (sequence stripped).
    pub fn drain_sent(&self) -> (Vec<String>, Vec<Vec<u8>>) {
        let mut oobs = Vec::new();
        let mut frames = Vec::new();

        for (_, data) in self.remote.drain_sent() {
            if data.len() >= 4
                && u32::from_le_bytes([data[0], data[1], data[2], data[3]]) == OOB_MARKER
            {
                oobs.push(String::from_utf8_lossy(&data[4..]).into_owned());
            } else if data.len() >= 4 {
                frames.push(data[4..].to_vec());
            }
        }

        (oobs, frames)
    }

    /// Drives the engine through the full handshake into `Connected`,
    /// discarding the traffic it generated along the way.
    pub fn establish_connection(&self) {
        self.connect();
        self.tick(); // InitReceived -> Downloading
        self.client.downloads_complete();
        self.tick(); // DownloadComplete -> Fetching
        self.tick(); // getinfo
        self.inject_oob("infoResponse \\hostname\\test\\world\\gta5");
        self.tick(); // -> Connecting, connect OOB
        self.inject_oob("connectOK 42 17 99");
        self.reset_server_sequence();
        self.tick(); // -> Connected
        self.drain_sent();
    }

    /// Brings the connection all the way to `Active` with an empty server
    /// frame.
    pub fn establish_active(&self) {
        self.establish_connection();
        self.inject_channel(&server_frame(0, |_| {}));
        self.tick();
        self.drain_sent();
    }
}

/// Builds the body of a server->client composite frame: the reliable
/// acknowledgement, caller-provided messages, then the end marker.
pub fn server_frame(ack: u32, write: impl FnOnce(&mut NetBuffer)) -> Vec<u8> {
    let mut msg = NetBuffer::with_capacity(16 * 1024);
    msg.write_u32(ack);
    write(&mut msg);
    msg.write_u32(uplink_shared::MSG_END);
    msg.bytes().to_vec()
}

/// Writes one reliable command into a server frame body.
pub fn write_reliable(msg: &mut NetBuffer, type_name: &str, id: u32, payload: &[u8]) {
    msg.write_u32(uplink_shared::hash_rage_string(type_name));
    msg.write_u32(id);
    msg.write_u16(payload.len() as u16);
    msg.write_bytes(payload);
}

pub fn ok_handshake() -> Arc<StubHttp> {
    StubHttp::with_response(Ok("sH: true\nprotocol: 5\ntoken: abc\n".to_string()))
}

/// A decoded client->server composite frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientFrame {
    pub ack: u32,
    pub frame_number: Option<u32>,
    pub routes: Vec<(u16, Vec<u8>)>,
    pub reliables: Vec<(u32, u32, Vec<u8>)>,
}

/// Decodes an outbound frame body (channel sequence already stripped),
/// mirroring what the server does with it. `has_frame_number` tracks the
/// negotiated server protocol (>= 2 adds the frame number field).
pub fn parse_client_frame(body: &[u8], has_frame_number: bool) -> ClientFrame {
    let mut msg = NetBuffer::from_bytes(body);
    let mut frame = ClientFrame {
        ack: msg.read_u32(),
        ..ClientFrame::default()
    };

    if has_frame_number {
        frame.frame_number = Some(msg.read_u32());
    }

    loop {
        assert!(!msg.end(), "frame body missing end marker");
        let msg_type = msg.read_u32();

        if msg_type == uplink_shared::MSG_END {
            break;
        }

        if msg_type == uplink_shared::MSG_ROUTE {
            let net_id = msg.read_u16();
            let length = msg.read_u16() as usize;
            let payload = msg.read_bytes(length).expect("truncated route payload");
            frame.routes.push((net_id, payload));
        } else {
            let raw_id = msg.read_u32();
            let (id, length) = if raw_id & 0x8000_0000 != 0 {
                (raw_id & !0x8000_0000, msg.read_u32() as usize)
            } else {
                (raw_id, msg.read_u16() as usize)
            };
            let payload = msg.read_bytes(length).expect("truncated reliable payload");
            frame.reliables.push((msg_type, id, payload));
        }
    }

    frame
}

/// Whether any sent frame carries a reliable command of the given type.
pub fn frames_contain_reliable(frames: &[Vec<u8>], type_name: &str, has_frame_number: bool) -> bool {
    let hash = uplink_shared::hash_rage_string(type_name);
    frames.iter().any(|frame| {
        parse_client_frame(frame, has_frame_number)
            .reliables
            .iter()
            .any(|(type_hash, _, _)| *type_hash == hash)
    })
}
