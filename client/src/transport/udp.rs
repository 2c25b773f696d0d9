use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use log::{trace, warn};

use uplink_shared::{AddressFamily, NetAddress};

use super::{DatagramTransport, TransportError};

const RECV_BUFFER_SIZE: usize = 2048;

/// UDP transport backed by one IPv4 and one IPv6 socket, both non-blocking
/// and bound to an OS-chosen ephemeral port.
///
/// The IPv6 socket is optional: on hosts without IPv6 the slot stays empty
/// and sends to v6 destinations fail with `FamilyUnavailable`.
pub struct UdpTransport {
    socket_v4: UdpSocket,
    socket_v6: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn bind() -> std::io::Result<Self> {
        let socket_v4 = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket_v4.set_nonblocking(true)?;

        let socket_v6 = match UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0)) {
            Ok(socket) => {
                socket.set_nonblocking(true)?;
                Some(socket)
            }
            Err(err) => {
                warn!("IPv6 socket unavailable: {}", err);
                None
            }
        };

        Ok(Self {
            socket_v4,
            socket_v6,
        })
    }

    fn socket_for(&self, family: AddressFamily) -> Option<&UdpSocket> {
        match family {
            AddressFamily::V4 => Some(&self.socket_v4),
            AddressFamily::V6 => self.socket_v6.as_ref(),
        }
    }
}

impl DatagramTransport for UdpTransport {
    fn send(&mut self, addr: &NetAddress, data: &[u8]) -> Result<(), TransportError> {
        let socket = self
            .socket_for(addr.family())
            .ok_or(TransportError::FamilyUnavailable {
                family: addr.family(),
            })?;

        let target: SocketAddr = (*addr).into();
        socket
            .send_to(data, target)
            .map_err(|_| TransportError::SendFailed {
                addr: *addr,
                len: data.len(),
            })?;

        Ok(())
    }

    fn try_recv(&mut self, family: AddressFamily) -> Option<(Vec<u8>, NetAddress)> {
        let socket = self.socket_for(family)?;

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                trace!("received {} bytes from {}", len, from);
                Some((buf[..len].to_vec(), NetAddress::from(from)))
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => None,
            Err(err) => {
                warn!("recv() failed - {}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_round_trip() {
        let mut a = UdpTransport::bind().unwrap();
        let mut b = UdpTransport::bind().unwrap();

        let b_port = b.socket_v4.local_addr().unwrap().port();
        let b_addr = NetAddress::V4(Ipv4Addr::LOCALHOST, b_port);

        a.send(&b_addr, b"ping").unwrap();

        // non-blocking receive needs a moment for local delivery
        let mut received = None;
        for _ in 0..100 {
            if let Some(packet) = b.try_recv(AddressFamily::V4) {
                received = Some(packet);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        let (data, _) = received.expect("datagram not delivered");
        assert_eq!(data, b"ping");
    }

    #[test]
    fn empty_socket_would_block() {
        let mut transport = UdpTransport::bind().unwrap();
        assert!(transport.try_recv(AddressFamily::V4).is_none());
    }
}
