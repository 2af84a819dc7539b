use serde::Serialize;

/// Observable state of a session's backend connection.
///
/// `Idle` and `Busy` both mean the socket is up; `Busy` means the head of the
/// pending queue has been written and its response line has not arrived yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No socket. The next send starts a connect attempt.
    Disconnected,

    /// A connect attempt is in progress; sends queue behind it.
    Connecting,

    /// Connected with nothing in flight.
    Idle,

    /// Connected with exactly one call in flight.
    Busy,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Idle | ConnectionState::Busy)
    }
}
