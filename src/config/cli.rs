use clap::Parser;
use std::{net::IpAddr, path::PathBuf, time::Duration};

use super::types::LogLevel;

// -----------------------------------------------------------------------------
// ----- CliConfig -------------------------------------------------------------

/// Overrides taken from the command line or the environment. Anything left
/// `None` falls through to the config file, then to the built-in default.
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub backend_host: Option<String>,
    pub backend_port: Option<u16>,
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    pub sweep_interval: Option<Duration>,
    pub max_line_bytes: Option<usize>,
    pub banner_greetings: Option<Vec<String>>,
    pub secure_cookies: Option<bool>,
    pub log_level: Option<LogLevel>,
    pub config_file: Option<PathBuf>,
}

impl CliConfig {
    /// Parse the process arguments; panic with clap's message when invalid.
    pub fn from_args() -> Self {
        let args = Args::try_parse().unwrap_or_else(|e| panic!("Invalid CLI/ENV: {e}"));
        args.into()
    }

    pub fn try_from_iter<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Args::try_parse_from(iter).map(Into::into)
    }
}

// -----------------------------------------------------------------------------
// ----- Args ------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "linecrab",
    version,
    about = "Per-session gateway to a line-delimited JSON backend"
)]
struct Args {
    // IPv4 or IPv6 literal to listen on (defaults to 0.0.0.0).
    #[arg(long = "host", short = 'H', env = "LINECRAB_HOST")]
    host: Option<IpAddr>,

    // HTTP listen port (defaults to 3000).
    #[arg(long = "port", short = 'p', env = "LINECRAB_PORT")]
    port: Option<u16>,

    #[arg(long = "backend-host", env = "LINECRAB_BACKEND_HOST")]
    backend_host: Option<String>,

    #[arg(long = "backend-port", env = "LINECRAB_BACKEND_PORT")]
    backend_port: Option<u16>,

    #[arg(long = "connect-timeout", env = "LINECRAB_CONNECT_TIMEOUT", value_parser = humantime::parse_duration)]
    connect_timeout: Option<Duration>,

    #[arg(long = "request-timeout", env = "LINECRAB_REQUEST_TIMEOUT", value_parser = humantime::parse_duration)]
    request_timeout: Option<Duration>,

    #[arg(long = "idle-timeout", env = "LINECRAB_IDLE_TIMEOUT", value_parser = humantime::parse_duration)]
    idle_timeout: Option<Duration>,

    #[arg(long = "sweep-interval", env = "LINECRAB_SWEEP_INTERVAL", value_parser = humantime::parse_duration)]
    sweep_interval: Option<Duration>,

    #[arg(long = "max-line-bytes", env = "LINECRAB_MAX_LINE_BYTES")]
    max_line_bytes: Option<usize>,

    // Comma separated; replaces the default greetings.
    #[arg(long = "banner", env = "LINECRAB_BANNER_GREETINGS", value_delimiter = ',')]
    banner_greetings: Vec<String>,

    #[arg(
        long = "secure-cookies",
        env = "LINECRAB_SECURE_COOKIES",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    secure_cookies: Option<bool>,

    #[arg(long = "log", env = "LINECRAB_LOG")]
    log_level: Option<LogLevel>,

    // Optional TOML file; must exist when given.
    #[arg(long = "config", env = "LINECRAB_CONFIG_FILE")]
    config_file: Option<PathBuf>,
}

impl From<Args> for CliConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            backend_host: args.backend_host,
            backend_port: args.backend_port,
            connect_timeout: args.connect_timeout,
            request_timeout: args.request_timeout,
            idle_timeout: args.idle_timeout,
            sweep_interval: args.sweep_interval,
            max_line_bytes: args.max_line_bytes,
            banner_greetings: (!args.banner_greetings.is_empty()).then_some(args.banner_greetings),
            secure_cookies: args.secure_cookies,
            log_level: args.log_level,
            config_file: args.config_file,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations_and_lists() {
        let cli = CliConfig::try_from_iter([
            "linecrab",
            "--backend-port",
            "6000",
            "--request-timeout",
            "250ms",
            "--idle-timeout",
            "2m",
            "--banner",
            "hola,hello",
            "--secure-cookies",
        ])
        .unwrap();

        assert_eq!(cli.backend_port, Some(6000));
        assert_eq!(cli.request_timeout, Some(Duration::from_millis(250)));
        assert_eq!(cli.idle_timeout, Some(Duration::from_secs(120)));
        assert_eq!(
            cli.banner_greetings,
            Some(vec!["hola".to_string(), "hello".to_string()])
        );
        assert_eq!(cli.secure_cookies, Some(true));
    }

    #[test]
    fn rejects_bad_duration() {
        let err = CliConfig::try_from_iter(["linecrab", "--idle-timeout", "soon"]);
        assert!(err.is_err());
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
