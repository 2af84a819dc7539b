use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use thiserror::Error;

use super::{
    cli::CliConfig,
    file::{ConfigFileError, FileConfig},
    types::LogLevel,
};
use crate::backend::{BackendAddr, BannerFilter};
use crate::gateway::SessionSettings;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const DEFAULT_LISTEN_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_LISTEN_PORT: u16 = 3000;

// -----------------------------------------------------------------------------
// ----- Global Singleton ------------------------------------------------------

static ROOT_CONFIG: OnceCell<Arc<RwLock<Config>>> = OnceCell::new();

// -----------------------------------------------------------------------------
// ----- Config ----------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: LogLevel,
    pub secure_cookies: bool,
    pub config_file: Option<PathBuf>,
    pub sessions: SessionSettings,
}

// -----------------------------------------------------------------------------
// ----- Config: Static --------------------------------------------------------

impl Config {
    /// Load CLI/ENV and the optional file. Panics on any error: do not start
    /// with a bad config.
    pub async fn init() {
        let cli = CliConfig::from_args();
        let cfg = Self::load(cli)
            .await
            .unwrap_or_else(|e| panic!("invalid configuration: {e}"));

        if ROOT_CONFIG.set(Arc::new(RwLock::new(cfg))).is_err() {
            panic!("Config::init called twice");
        }
    }

    pub fn snapshot() -> Config {
        Self::handle().read().clone()
    }

    /// Read the file named by `cli` (if any) and merge.
    pub async fn load(cli: CliConfig) -> Result<Config, ConfigError> {
        let file = match &cli.config_file {
            Some(path) => FileConfig::from_file_async(path).await?,
            None => FileConfig::default(),
        };

        Self::merge(cli, file)
    }

    /// CLI/ENV beats file beats built-in default.
    pub fn merge(cli: CliConfig, file: FileConfig) -> Result<Config, ConfigError> {
        let defaults = SessionSettings::default();

        let listen_addr = SocketAddr::new(
            cli.host.or(file.listen.host).unwrap_or(DEFAULT_LISTEN_HOST),
            cli.port.or(file.listen.port).unwrap_or(DEFAULT_LISTEN_PORT),
        );

        let banner = cli
            .banner_greetings
            .or(file.backend.banner_greetings)
            .map(BannerFilter::new)
            .unwrap_or(defaults.banner);

        let sessions = SessionSettings {
            backend: BackendAddr {
                host: cli
                    .backend_host
                    .or(file.backend.host)
                    .unwrap_or(defaults.backend.host),
                port: cli
                    .backend_port
                    .or(file.backend.port)
                    .unwrap_or(defaults.backend.port),
            },
            connect_timeout: cli
                .connect_timeout
                .or(file.backend.connect_timeout)
                .unwrap_or(defaults.connect_timeout),
            request_timeout: cli
                .request_timeout
                .or(file.sessions.request_timeout)
                .unwrap_or(defaults.request_timeout),
            idle_timeout: cli
                .idle_timeout
                .or(file.sessions.idle_timeout)
                .unwrap_or(defaults.idle_timeout),
            sweep_interval: cli
                .sweep_interval
                .or(file.sessions.sweep_interval)
                .unwrap_or(defaults.sweep_interval),
            max_line_bytes: cli
                .max_line_bytes
                .or(file.backend.max_line_bytes)
                .unwrap_or(defaults.max_line_bytes),
            banner,
        };

        let cfg = Config {
            listen_addr,
            log_level: cli.log_level.or(file.log_level).unwrap_or_default(),
            secure_cookies: cli.secure_cookies.or(file.listen.secure_cookies).unwrap_or(false),
            config_file: cli.config_file,
            sessions,
        };

        cfg.validate()?;
        Ok(cfg)
    }
}

// -----------------------------------------------------------------------------
// ----- Config: Private -------------------------------------------------------

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sessions;

        if s.backend.host.trim().is_empty() {
            return Err(ConfigError::invalid("backend host", "must not be empty"));
        }
        if s.backend.port == 0 {
            return Err(ConfigError::invalid("backend port", "must not be 0"));
        }
        for (field, value) in [
            ("connect timeout", s.connect_timeout),
            ("request timeout", s.request_timeout),
            ("idle timeout", s.idle_timeout),
            ("sweep interval", s.sweep_interval),
        ] {
            if value == Duration::ZERO {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }
        if s.max_line_bytes == 0 {
            return Err(ConfigError::invalid("max line bytes", "must be greater than zero"));
        }

        Ok(())
    }

    fn handle() -> Arc<RwLock<Config>> {
        ROOT_CONFIG
            .get()
            .expect("Config not initialized; call Config::init().await first")
            .clone()
    }
}

// -----------------------------------------------------------------------------
// ----- ConfigError -----------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    File(#[from] ConfigFileError),

    #[error("{field} {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: &'static str) -> Self {
        ConfigError::Invalid { field, reason }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
