mod channel;
mod udp;

pub use channel::{ChannelTransport, PacketChannel, PacketChannelRemote};
pub use udp::UdpTransport;

use thiserror::Error;

use uplink_shared::{AddressFamily, NetAddress};

/// Errors that can occur sending a datagram
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No socket exists for the destination's address family
    #[error("No socket is available for the {family:?} address family")]
    FamilyUnavailable { family: AddressFamily },

    /// The OS rejected the send
    #[error("Failed to send a {len}-byte datagram to {addr}")]
    SendFailed { addr: NetAddress, len: usize },
}

/// Non-blocking datagram transport over both IP families.
///
/// `try_recv` is polled in a loop per family until it returns `None`
/// (would-block). Implementations log any other receive error and end the
/// loop the same way.
pub trait DatagramTransport: Send {
    fn send(&mut self, addr: &NetAddress, data: &[u8]) -> Result<(), TransportError>;

    fn try_recv(&mut self, family: AddressFamily) -> Option<(Vec<u8>, NetAddress)>;
}
