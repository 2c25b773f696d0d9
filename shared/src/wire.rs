//! Wire-format constants for the server channel.
//!
//! All numeric fields on the wire are little-endian. A datagram whose first
//! four bytes are [`OOB_MARKER`] carries an out-of-band ASCII command; any
//! other datagram belongs to the framed channel.

/// Protocol version advertised by this client during the HTTP handshake.
pub const NETWORK_PROTOCOL: u32 = 4;

/// First four bytes (LE) of an out-of-band datagram.
pub const OOB_MARKER: u32 = 0xFFFF_FFFF;

/// Per-entity routed payload.
pub const MSG_ROUTE: u32 = 0xE938_445B;

/// Server frame number (plus ping when the server protocol allows).
pub const MSG_FRAME: u32 = 0x53FF_FA3F;

/// Terminates the message loop inside a composite frame.
pub const MSG_END: u32 = 0xCA56_9E63;

/// Host handoff: new host net id and base.
pub const MSG_I_HOST: u32 = 0xB3EA_30DE;

/// Upper bound on unacknowledged outbound reliable commands; exceeding it is
/// a fatal session error.
pub const MAX_RELIABLE_COMMANDS: u32 = 64;

/// Out-of-band send buffer bound.
pub const MAX_OOB_SIZE: usize = 32 * 1024;

/// Routed payloads carry a u16 length on the wire.
pub const MAX_ROUTED_PAYLOAD: usize = 64 * 1024 - 1;
