use serde::Deserialize;
use std::{
    net::IpAddr,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tokio::fs;

use super::types::{LogLevel, deserialize_opt_duration};

// -----------------------------------------------------------------------------
// ----- FileConfig ------------------------------------------------------------

/// Optional TOML config file. Every field may be omitted.
///
/// ```toml
/// log_level = "debug"
///
/// [listen]
/// host = "0.0.0.0"
/// port = 3000
///
/// [backend]
/// host = "127.0.0.1"
/// port = 5000
/// connect_timeout = "5s"
///
/// [sessions]
/// request_timeout = "10s"
/// idle_timeout = "2m"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub log_level: Option<LogLevel>,
    #[serde(default)]
    pub listen: ListenSection,
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub sessions: SessionsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenSection {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub secure_cookies: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub connect_timeout: Option<Duration>,
    pub max_line_bytes: Option<usize>,
    pub banner_greetings: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsSection {
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub request_timeout: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub idle_timeout: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub sweep_interval: Option<Duration>,
}

// -----------------------------------------------------------------------------
// ----- FileConfig: Static ----------------------------------------------------

impl FileConfig {
    pub async fn from_file_async(path: &Path) -> Result<FileConfig, ConfigFileError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| ConfigFileError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<FileConfig, ConfigFileError> {
        toml::from_str(raw).map_err(|e| ConfigFileError::Toml { source: e })
    }
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {source}")]
    Toml {
        #[source]
        source: toml::de::Error,
    },
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let cfg = FileConfig::parse(
            r#"
            log_level = "debug"

            [listen]
            port = 8080
            secure_cookies = true

            [backend]
            host = "backend.internal"
            port = 7000
            connect_timeout = "750ms"
            banner_greetings = ["hola"]

            [sessions]
            request_timeout = "3s"
            idle_timeout = "5m"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.log_level, Some(LogLevel::Debug));
        assert_eq!(cfg.listen.port, Some(8080));
        assert_eq!(cfg.listen.secure_cookies, Some(true));
        assert_eq!(cfg.backend.host.as_deref(), Some("backend.internal"));
        assert_eq!(cfg.backend.connect_timeout, Some(Duration::from_millis(750)));
        assert_eq!(cfg.sessions.request_timeout, Some(Duration::from_secs(3)));
        assert_eq!(cfg.sessions.idle_timeout, Some(Duration::from_secs(300)));
        assert_eq!(cfg.sessions.sweep_interval, None);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = FileConfig::parse("").unwrap();
        assert!(cfg.backend.port.is_none());
        assert!(cfg.sessions.idle_timeout.is_none());
    }

    #[test]
    fn rejects_unknown_keys_and_bad_durations() {
        assert!(matches!(
            FileConfig::parse("[backend]\nprot = 1\n"),
            Err(ConfigFileError::Toml { .. })
        ));
        assert!(FileConfig::parse("[sessions]\nidle_timeout = \"later\"\n").is_err());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = FileConfig::from_file_async(Path::new("/definitely/not/here.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigFileError::Io { .. }));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
