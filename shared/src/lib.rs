//! # Uplink Shared
//! Wire-level primitives shared by the uplink session networking crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod address;
mod backends;
mod hash;
mod info_string;
mod net_buffer;
mod wire;

pub use address::{AddressError, AddressFamily, NetAddress};
pub use backends::{Clock, SystemClock};
pub use hash::hash_rage_string;
pub use info_string::{info_value, strip_colors, MAX_INFO_STRING};
pub use net_buffer::NetBuffer;
pub use wire::{
    MAX_OOB_SIZE, MAX_RELIABLE_COMMANDS, MAX_ROUTED_PAYLOAD, MSG_END, MSG_FRAME, MSG_I_HOST,
    MSG_ROUTE, NETWORK_PROTOCOL, OOB_MARKER,
};
