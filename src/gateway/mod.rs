pub mod reaper;
pub mod registry;
pub mod session;
pub mod settings;

pub use reaper::IdleReaper;
pub use registry::{RegistryStats, SessionRegistry, SessionStats};
pub use session::{NON_JSON_RESPONSE, SessionConnection};
pub use settings::{CallOptions, SessionSettings};
