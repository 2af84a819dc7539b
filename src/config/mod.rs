pub mod cli;
pub mod config;
pub mod file;
pub mod types;

pub use cli::CliConfig;
pub use config::{Config, ConfigError};
pub use file::{ConfigFileError, FileConfig};
pub use types::LogLevel;
