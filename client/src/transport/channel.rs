use std::sync::Arc;

use crossbeam_queue::SegQueue;

use uplink_shared::{AddressFamily, NetAddress};

use super::{DatagramTransport, TransportError};

/// In-memory transport pair for tests and demos.
///
/// The engine-facing half implements [`DatagramTransport`]; the remote half
/// injects inbound datagrams and drains whatever the engine sent.
pub struct PacketChannel;

impl PacketChannel {
    pub fn unbounded() -> (ChannelTransport, PacketChannelRemote) {
        let inbound = Arc::new(SegQueue::new());
        let sent = Arc::new(SegQueue::new());

        (
            ChannelTransport {
                inbound: Arc::clone(&inbound),
                sent: Arc::clone(&sent),
            },
            PacketChannelRemote { inbound, sent },
        )
    }
}

pub struct ChannelTransport {
    inbound: Arc<SegQueue<(Vec<u8>, NetAddress)>>,
    sent: Arc<SegQueue<(NetAddress, Vec<u8>)>>,
}

impl DatagramTransport for ChannelTransport {
    fn send(&mut self, addr: &NetAddress, data: &[u8]) -> Result<(), TransportError> {
        self.sent.push((*addr, data.to_vec()));
        Ok(())
    }

    fn try_recv(&mut self, family: AddressFamily) -> Option<(Vec<u8>, NetAddress)> {
        // single queue; family filtering mirrors the dual-socket transport
        let (data, from) = self.inbound.pop()?;
        if from.family() == family {
            Some((data, from))
        } else {
            self.inbound.push((data, from));
            None
        }
    }
}

#[derive(Clone)]
pub struct PacketChannelRemote {
    inbound: Arc<SegQueue<(Vec<u8>, NetAddress)>>,
    sent: Arc<SegQueue<(NetAddress, Vec<u8>)>>,
}

impl PacketChannelRemote {
    /// Queues a datagram for the engine to receive.
    pub fn inject(&self, from: NetAddress, data: &[u8]) {
        self.inbound.push((data.to_vec(), from));
    }

    /// Removes and returns everything the engine has sent so far.
    pub fn drain_sent(&self) -> Vec<(NetAddress, Vec<u8>)> {
        let mut out = Vec::new();
        while let Some(item) = self.sent.pop() {
            out.push(item);
        }
        out
    }
}
