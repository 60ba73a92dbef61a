use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const KILOBYTE: usize = 1024;

pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * KILOBYTE;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Buffering parameters of a [`ResponseStream`](crate::ResponseStream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Bytes reserved up front for the buffer.
    pub initial_capacity: usize,
    /// Chunk size used when a plain reader is turned into a chunk source.
    pub read_chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Falls back to [`DEFAULT_USER_AGENT`](crate::http::DEFAULT_USER_AGENT).
    pub user_agent: Option<String>,
    /// Whole-request timeout; `None` disables it.
    pub timeout_secs: Option<u64>,
    /// Fail requests answered with a 4xx/5xx status.
    pub raise_for_status: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            raise_for_status: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stream: StreamConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());

        let bytes = fs::read(path)?;
        let config: Config = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream.read_chunk_size == 0 {
            return Err(Error::Config(
                "read_chunk_size must be positive".to_owned(),
            ));
        }
        if self.session.timeout_secs == Some(0) {
            return Err(Error::Config(
                "timeout_secs must be positive, use null to disable".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new("config_partial").unwrap();
        let path = write_config(
            &dir,
            r#"{ "session": { "user_agent": "curl/8.0", "raise_for_status": true } }"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.stream, StreamConfig::default());
        assert_eq!(config.session.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(config.session.timeout_secs, Some(DEFAULT_TIMEOUT_SECS));
        assert!(config.session.raise_for_status);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let dir = TempDir::new("config_invalid").unwrap();
        let path =
            write_config(&dir, r#"{ "stream": { "read_chunk_size": 0 } }"#);

        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = TempDir::new("config_malformed").unwrap();
        let path = write_config(&dir, "{ not json");

        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new("config_missing").unwrap();
        let path = dir.path().join("absent.json");

        assert!(matches!(Config::load(&path), Err(Error::Io(_))));
    }
}
