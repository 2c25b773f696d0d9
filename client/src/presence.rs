/// Rich-presence observer, fed during the handshake.
///
/// Written only from the tick thread.
pub trait PresenceSink: Send {
    /// Presence template; `{N}` placeholders reference indexed values.
    fn set_template(&mut self, template: &str);

    /// One indexed value within the current template.
    fn set_value(&mut self, index: u32, value: &str);

    /// Join-command string advertised once a server accepts the handshake.
    fn set_connect_value(&mut self, value: &str);
}
