use std::fmt;

/// Lifecycle of the chat connection.
///
/// `Closed` is only reached through an explicit teardown or a normal
/// closure from the server; abnormal drops go back to `Connecting`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum ConnectionState {
    Connecting,
    Open,
    #[default]
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "online",
            ConnectionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// WebSocket close code as carried by a close frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct CloseCode(pub u16);

impl CloseCode {
    pub const NORMAL: CloseCode = CloseCode(1000);
    pub const ABNORMAL: CloseCode = CloseCode(1006);

    pub fn is_normal(&self) -> bool {
        *self == Self::NORMAL
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
