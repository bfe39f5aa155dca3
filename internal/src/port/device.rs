/// Bidirectional line-protocol endpoint (motion controller, extruder).
///
/// Text instructions go in, the device is polled for the literal `ok`
/// acknowledgment coming back.
#[cfg_attr(test, mockall::automock)]
pub trait DevicePort {
    fn connect(&mut self, retries: u32) -> anyhow::Result<()>;
    fn send(&mut self, instruction: &str) -> anyhow::Result<()>;
    /// Non-blocking read of the next complete line, if any.
    fn recv(&mut self) -> Option<String>;
}
