//! Inbound remote commands.
//!
//! The control characteristic carries a free-form payload of which only
//! the first byte is significant.

/// Servo commands a connected peer can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Payload starting with `b'1'`.
    Open,
    /// Payload starting with `b'0'`.
    Close,
}

impl RemoteCommand {
    /// Decode a control-characteristic write.  Any other leading byte, or
    /// an empty payload, is not a command.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload.first()? {
            b'1' => Some(Self::Open),
            b'0' => Some(Self::Close),
            _ => None,
        }
    }
}
