pub mod backend;
pub mod config;
pub mod errors;
pub mod frontend;
pub mod gateway;
pub mod net;
pub mod shared_types;

pub use config::Config;
pub use errors::{CallError, ConnectionError};
pub use frontend::router;
pub use gateway::{CallOptions, IdleReaper, SessionConnection, SessionRegistry, SessionSettings};
pub use shared_types::SessionId;
