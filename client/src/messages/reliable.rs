use std::collections::VecDeque;

use log::trace;
use thiserror::Error;

use uplink_shared::{hash_rage_string, NetBuffer};

use crate::metrics::{PacketMetrics, PacketSubComponent};

/// Payloads longer than this switch the wire encoding to a u32 length and
/// flag bit 31 of the command id.
const LARGE_PAYLOAD_THRESHOLD: usize = u16::MAX as usize;

pub(crate) const LARGE_ID_BIT: u32 = 0x8000_0000;

/// Errors raised by the outbound reliable store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReliableError {
    /// More unacknowledged commands than the window allows; the session is
    /// beyond repair
    #[error("Reliable client command overflow ({unacknowledged} unacknowledged)")]
    Overflow { unacknowledged: u32 },
}

/// A pending outbound reliable command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutReliableCommand {
    pub type_hash: u32,
    pub id: u32,
    pub payload: Vec<u8>,
}

/// Ordered store of outbound reliable commands.
///
/// Every pending command is re-serialized into every outbound frame, oldest
/// first, until the server's acknowledgement passes its id: at-least-once by
/// simple retry-until-acked.
pub struct ReliableSender {
    sequence: u32,
    acknowledged: u32,
    commands: VecDeque<OutReliableCommand>,
    window: u32,
}

impl ReliableSender {
    pub fn new(window: u32) -> Self {
        Self {
            sequence: 0,
            acknowledged: 0,
            commands: VecDeque::new(),
            window,
        }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn acknowledged(&self) -> u32 {
        self.acknowledged
    }

    pub fn pending(&self) -> impl Iterator<Item = &OutReliableCommand> {
        self.commands.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.commands.len()
    }

    /// Queues a command, assigning it the next id.
    pub fn push(&mut self, type_name: &str, payload: Vec<u8>) -> Result<u32, ReliableError> {
        let unacknowledged = self.sequence - self.acknowledged;
        if unacknowledged > self.window {
            return Err(ReliableError::Overflow { unacknowledged });
        }

        self.sequence += 1;
        let id = self.sequence;

        self.commands.push_back(OutReliableCommand {
            type_hash: hash_rage_string(type_name),
            id,
            payload,
        });

        Ok(id)
    }

    /// Applies an acknowledgement: every command with `id <= ack` is done.
    pub fn ack(&mut self, ack: u32) {
        if ack == self.acknowledged {
            return;
        }
        if ack > self.sequence {
            trace!(
                "ignoring acknowledgement {} beyond sequence {}",
                ack,
                self.sequence
            );
            return;
        }

        self.commands.retain(|command| command.id > ack);
        self.acknowledged = ack;
    }

    /// Re-serializes every pending command, oldest first.
    pub fn write_into(&self, msg: &mut NetBuffer, metrics: &mut PacketMetrics) {
        for command in &self.commands {
            msg.write_u32(command.type_hash);

            if command.payload.len() > LARGE_PAYLOAD_THRESHOLD {
                msg.write_u32(command.id | LARGE_ID_BIT);
                msg.write_u32(command.payload.len() as u32);
                metrics.add_element_size(PacketSubComponent::ReliableMessages, 4);
            } else {
                msg.write_u32(command.id);
                msg.write_u16(command.payload.len() as u16);
                metrics.add_element_size(PacketSubComponent::ReliableMessages, 2);
            }

            msg.write_bytes(&command.payload);

            metrics
                .add_element_size(PacketSubComponent::ReliableMessages, command.payload.len() + 8);
        }
    }

    /// Drops all pending commands and counters (new session).
    pub fn reset(&mut self) {
        self.sequence = 0;
        self.acknowledged = 0;
        self.commands.clear();
    }
}
