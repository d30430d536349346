use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
pub const DEFAULT_MAX_HEADER_SIZE: usize = 10 * 1024 * 1024; // 10 MiB
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_BACKLOG: i32 = 5;

/*
Server settings read from a TOML file. Every field falls back to its default, so
an empty file (or a file that only sets `port`) is still a valid configuration.
*/
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    pub timeout_seconds: u64,
    pub buffer_size: usize,
    pub max_header_size: usize,
    pub max_body_size: usize,
    pub backlog: i32,
    pub respond: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            backlog: DEFAULT_BACKLOG,
            respond: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Config::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size must be greater than 0".into()));
        }
        if self.max_header_size == 0 {
            return Err(ConfigError::Invalid("max_header_size must be greater than 0".into()));
        }
        if self.timeout_seconds == 0 {
            // A zero read timeout is rejected by the socket layer.
            return Err(ConfigError::Invalid("timeout_seconds must be greater than 0".into()));
        }
        if self.backlog <= 0 {
            return Err(ConfigError::Invalid("backlog must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_toml("").expect("❌ Failed to parse config");
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.max_header_size, 10 * 1024 * 1024);
        assert_eq!(config.backlog, 5);
        assert!(!config.respond);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml("port = 7878\nrespond = true\n").unwrap();
        assert_eq!(config.port, 7878);
        assert!(config.respond);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.address(), "127.0.0.1:7878");
    }

    #[test]
    fn test_checked_in_config_file() {
        let config = Config::load(Path::new("config.toml")).expect("❌ Failed to read config file");
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_rejects_zero_buffer() {
        let err = Config::from_toml("buffer_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_types() {
        let err = Config::from_toml("port = \"eighty\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
