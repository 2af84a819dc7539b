pub mod connection_state;
pub mod session_id;

pub use connection_state::ConnectionState;
pub use session_id::SessionId;
