use uplink_shared::NetAddress;

/// Everything negotiated with one particular server.
///
/// Reset wholesale on every `Idle -> Initing` transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub token: String,
    pub server_protocol: u32,
    pub current_server: Option<NetAddress>,
    pub server_net_id: u16,
    pub host_net_id: u16,
    pub host_base: u32,
    pub enhanced_host_support: bool,
    pub scripthook_allowed: bool,
}
