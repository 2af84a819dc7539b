use std::time::Duration;

use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- ConnectionError -------------------------------------------------------

/// Anything that takes a session's backend connection down. One instance is
/// cloned into every call that was queued when it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("failed to connect to backend {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("backend closed the connection")]
    Closed,

    #[error("backend i/o error: {0}")]
    Io(String),

    #[error("backend sent a line longer than {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("session destroyed")]
    SessionDestroyed,
}

impl ConnectionError {
    pub fn io(err: std::io::Error) -> Self {
        ConnectionError::Io(err.to_string())
    }
}

// -----------------------------------------------------------------------------
// ----- CallError -------------------------------------------------------------

/// Why a single `send` did not produce a response value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("backend request timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    #[error("failed to encode request: {0}")]
    Encode(String),

    /// The session was destroyed before the call could be queued. Nothing was
    /// written; the registry answers this by routing to a fresh session.
    #[error("session retired")]
    Retired,
}

impl CallError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Timeout(_))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, CallError::Connection(_))
    }
}

// -----------------------------------------------------------------------------
// ----- FrameError ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

impl From<FrameError> for ConnectionError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::LineTooLong { limit } => ConnectionError::LineTooLong { limit },
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
