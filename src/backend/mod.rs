// Backend side: one TCP link per session, plus the banner recognizer used
// while a link is fresh.
pub mod backend_connection;
pub mod banner;

pub use backend_connection::{BackendAddr, BackendConnection, BackendLink, LinkEvents};
pub use banner::BannerFilter;
