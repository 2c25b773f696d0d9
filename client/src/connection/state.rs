/// Where the engine stands between "no session" and "exchanging gameplay
/// traffic".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    /// HTTP handshake in flight.
    Initing,
    /// Handshake accepted, waiting for the next tick.
    InitReceived,
    /// Content download delegated to the embedding game.
    Downloading,
    DownloadComplete,
    /// Polling the server with `getinfo`.
    Fetching,
    /// Polling the server with `connect`.
    Connecting,
    /// `connectOK` received, no in-channel traffic yet.
    Connected,
    Active,
}

impl ConnectionState {
    /// States in which the embedding game is expected to keep ticking the
    /// engine itself rather than running gameplay.
    pub fn is_mid_handshake(self) -> bool {
        !matches!(
            self,
            ConnectionState::Idle | ConnectionState::Connected | ConnectionState::Active
        )
    }
}
