use std::time::Duration;

use uplink_shared::MAX_RELIABLE_COMMANDS;

/// Timing and window parameters for the connection engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Minimum spacing between outbound composite frames.
    pub send_interval: Duration,
    /// Spacing between handshake retries (`getinfo` / `connect`).
    pub handshake_retry_interval: Duration,
    /// Handshake attempts beyond this count time the connection out.
    pub max_handshake_attempts: u32,
    /// Silence on an active connection longer than this times it out.
    pub active_timeout: Duration,
    /// Upper bound on unacknowledged outbound reliable commands.
    pub max_reliable_commands: u32,
    /// Overrides the identity provider's display name in the handshake.
    pub player_name: Option<String>,
    /// World assumed when the server's info string does not name one.
    pub default_world: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            send_interval: Duration::from_millis(1000 / 60),
            handshake_retry_interval: Duration::from_secs(5),
            max_handshake_attempts: 3,
            active_timeout: Duration::from_secs(15),
            max_reliable_commands: MAX_RELIABLE_COMMANDS,
            player_name: None,
            default_world: "gta5".to_string(),
        }
    }
}
