use std::time::Duration;

use crate::backend::{BackendAddr, BannerFilter};

// -----------------------------------------------------------------------------
// ----- Defaults --------------------------------------------------------------

pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";
pub const DEFAULT_BACKEND_PORT: u16 = 5000;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

// -----------------------------------------------------------------------------
// ----- SessionSettings -------------------------------------------------------

/// Everything a session needs to reach and talk to the backend.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub backend: BackendAddr,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
    pub max_line_bytes: usize,
    pub banner: BannerFilter,
}

impl SessionSettings {
    /// How often the reaper sweeps: never less often than the idle threshold.
    pub fn reaper_period(&self) -> Duration {
        self.idle_timeout.min(self.sweep_interval)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            backend: BackendAddr {
                host: DEFAULT_BACKEND_HOST.to_string(),
                port: DEFAULT_BACKEND_PORT,
            },
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            banner: BannerFilter::default(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- CallOptions -----------------------------------------------------------

/// Per-call knobs. `None` falls back to the session's request timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
