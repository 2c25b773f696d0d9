use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crossbeam_queue::SegQueue;
use log::warn;

use uplink_shared::MAX_ROUTED_PAYLOAD;

/// A per-entity payload travelling between the server and the game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingPacket {
    pub net_id: u16,
    pub payload: Vec<u8>,
    pub gen_time: u64,
}

#[derive(Default)]
struct IncomingState {
    packets: VecDeque<RoutingPacket>,
    // queue delays observed at dequeue time, flushed to the metrics sink by
    // the next tick so the sink only ever runs on the tick thread
    delays: Vec<u32>,
}

/// Server→game FIFO: mutex-guarded queue plus a wakeup for game-thread
/// consumers blocked in [`IncomingQueue::wait_for_packet`].
pub struct IncomingQueue {
    state: Mutex<IncomingState>,
    signal: Condvar,
}

impl IncomingQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(IncomingState::default()),
            signal: Condvar::new(),
        }
    }

    pub fn enqueue(&self, packet: RoutingPacket) {
        let mut state = self.state.lock().unwrap();
        state.packets.push_back(packet);
        self.signal.notify_one();
    }

    /// Blocks until a packet is available or `timeout` elapses; returns
    /// whether a packet is waiting.
    pub fn wait_for_packet(&self, timeout: Duration) -> bool {
        let state = self.state.lock().unwrap();
        if !state.packets.is_empty() {
            return true;
        }

        let (state, _) = self
            .signal
            .wait_timeout_while(state, timeout, |state| state.packets.is_empty())
            .unwrap();

        !state.packets.is_empty()
    }

    /// Pops the oldest packet, recording how long it sat in the queue.
    pub fn dequeue(&self, now_ms: u64) -> Option<(u16, Vec<u8>)> {
        let mut state = self.state.lock().unwrap();
        let packet = state.packets.pop_front()?;

        state
            .delays
            .push(now_ms.saturating_sub(packet.gen_time) as u32);

        Some((packet.net_id, packet.payload))
    }

    /// Takes the queue delays accumulated since the last call.
    pub fn take_delays(&self) -> Vec<u32> {
        std::mem::take(&mut self.state.lock().unwrap().delays)
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.packets.clear();
        state.delays.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for IncomingQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Game→server FIFO: lock-free, multi-producer, drained by the send path.
pub struct OutgoingQueue {
    queue: SegQueue<RoutingPacket>,
}

impl OutgoingQueue {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    pub fn push(&self, net_id: u16, payload: Vec<u8>) {
        if payload.len() > MAX_ROUTED_PAYLOAD {
            warn!(
                "dropping {}-byte routed payload for {} (limit {})",
                payload.len(),
                net_id,
                MAX_ROUTED_PAYLOAD
            );
            return;
        }

        self.queue.push(RoutingPacket {
            net_id,
            payload,
            gen_time: 0,
        });
    }

    pub fn try_pop(&self) -> Option<RoutingPacket> {
        self.queue.pop()
    }

    pub fn clear(&self) {
        while self.queue.pop().is_some() {}
    }
}

impl Default for OutgoingQueue {
    fn default() -> Self {
        Self::new()
    }
}
