/// Byte-count buckets inside a single composite packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketSubComponent {
    RoutedMessages,
    ReliableMessages,
    Overhead,
}

/// Per-packet size breakdown handed to the metrics sink.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PacketMetrics {
    sizes: [usize; 3],
}

impl PacketMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element_size(&mut self, component: PacketSubComponent, size: usize) {
        self.sizes[component as usize] += size;
    }

    pub fn element_size(&self, component: PacketSubComponent) -> usize {
        self.sizes[component as usize]
    }

    pub fn total_size(&self) -> usize {
        self.sizes.iter().sum()
    }
}

/// Pure observer of packet- and latency-level measurements.
///
/// Called only from the tick thread.
pub trait MetricsSink: Send {
    fn on_incoming_packet(&mut self, metrics: &PacketMetrics);
    fn on_outgoing_packet(&mut self, metrics: &PacketMetrics);
    fn on_ping_result(&mut self, ping_ms: i32);
    fn on_route_delay_result(&mut self, delay_ms: u32);
}
