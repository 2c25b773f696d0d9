//! # Uplink Client
//! Client-side network engine for a game session host: drives the handshake
//! from address lookup through active play, keeps an at-least-once in-order
//! command channel over UDP, and routes per-entity payloads between the
//! server and the local game.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod channel;
mod client;
mod config;
mod connection;
mod events;
mod game;
mod handshake;
mod identity;
mod messages;
mod metrics;
mod presence;
mod routing;
pub mod transport;

pub use channel::{ChannelIo, NetChannel};
pub use client::{ClientDeps, NetClient};
pub use config::EngineConfig;
pub use connection::{ConnectionState, SessionContext};
pub use events::{EngineEvents, EventDispatcher, EventToken, Progress, StateChange};
pub use game::{GameInit, NoGameInit};
pub use handshake::{
    encode_auth_ticket, parse_init_response, InitCompletion, InitDecision, InitHttpResult,
    InitRequestClient,
};
pub use identity::{IdentityProvider, TempIdentity};
pub use messages::{HandlerToken, OutReliableCommand, ReliableError, ReliableHandlers,
    ReliableSender};
pub use metrics::{MetricsSink, PacketMetrics, PacketSubComponent};
pub use presence::PresenceSink;
pub use routing::{IncomingQueue, OutgoingQueue, RoutingPacket};
