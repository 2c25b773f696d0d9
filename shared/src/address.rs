use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, ToSocketAddrs};

use thiserror::Error;

/// Errors that can occur while producing a [`NetAddress`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Hostname lookup failed or yielded no usable address
    #[error("Could not resolve '{host}:{port}' to a socket address")]
    ResolutionFailed { host: String, port: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

/// The address of a single remote peer, one of the two IP families.
///
/// Immutable after construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetAddress {
    V4(Ipv4Addr, u16),
    V6(Ipv6Addr, u16),
}

impl NetAddress {
    /// Resolves `host:port` and takes the first result.
    pub fn resolve(host: &str, port: u16) -> Result<Self, AddressError> {
        (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .map(Self::from)
            .ok_or_else(|| AddressError::ResolutionFailed {
                host: host.to_string(),
                port,
            })
    }

    pub fn family(&self) -> AddressFamily {
        match self {
            NetAddress::V4(_, _) => AddressFamily::V4,
            NetAddress::V6(_, _) => AddressFamily::V6,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            NetAddress::V4(_, port) | NetAddress::V6(_, port) => *port,
        }
    }

    pub fn ip(&self) -> IpAddr {
        match self {
            NetAddress::V4(ip, _) => IpAddr::V4(*ip),
            NetAddress::V6(ip, _) => IpAddr::V6(*ip),
        }
    }
}

impl From<SocketAddr> for NetAddress {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => NetAddress::V4(*v4.ip(), v4.port()),
            SocketAddr::V6(v6) => NetAddress::V6(*v6.ip(), v6.port()),
        }
    }
}

impl From<NetAddress> for SocketAddr {
    fn from(addr: NetAddress) -> Self {
        match addr {
            NetAddress::V4(ip, port) => SocketAddr::V4(SocketAddrV4::new(ip, port)),
            NetAddress::V6(ip, port) => SocketAddr::V6(SocketAddrV6::new(ip, port, 0, 0)),
        }
    }
}

impl fmt::Display for NetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetAddress::V4(ip, port) => write!(f, "{}:{}", ip, port),
            NetAddress::V6(ip, port) => write!(f, "[{}]:{}", ip, port),
        }
    }
}
