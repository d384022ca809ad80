//! Server configuration.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. `--config` flag / `CORPUS_CONFIG` environment variable
//! 2. Config file (~/.corpus/config.toml), if present
//! 3. Default values
//!
//! `--host` / `--port` override the `[server]` section after loading.

use anyhow::{Context, Result};
use corpus_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener and background probing
    #[serde(default)]
    pub server: ServerConfig,

    /// Capabilities, timeouts, health policy and default pipeline
    #[serde(flatten)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds between background capability probes (0 disables)
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_probe_interval() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            probe_interval_secs: default_probe_interval(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, the default path, or defaults.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .engine
            .validate()
            .context("Invalid engine configuration")?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".corpus")
            .join("config.toml")
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.probe_interval_secs, 30);
        assert_eq!(config.engine.capabilities.len(), 4);
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_default_path() {
        let path = Config::default_path();
        assert!(path.ends_with(".corpus/config.toml"));
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
[server]
host = "127.0.0.1"
port = 6100
probe_interval_secs = 0

[capabilities.speech]
url = "http://speech.local:5001"

[capabilities.vision]
url = "http://vision.local:5002"

[timeouts]
probe_ms = 1000

[health]
gate_calls = true

[pipeline]
interval_ms = 2500
emotion = "calm"
"#,
        );

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:6100");
        assert_eq!(config.server.probe_interval_secs, 0);
        assert_eq!(config.engine.capabilities.len(), 2);
        assert_eq!(
            config.engine.capabilities["vision"].url,
            "http://vision.local:5002"
        );
        assert_eq!(config.engine.timeouts.probe_ms, 1000);
        assert_eq!(config.engine.timeouts.call_ms, 30_000);
        assert!(config.engine.health.gate_calls);
        assert!(!config.engine.health.track_calls);
        assert_eq!(config.engine.pipeline.interval_ms, 2500);
        assert_eq!(config.engine.pipeline.emotion_tag, "calm");
        assert_eq!(config.engine.pipeline.voice_id, "ito");
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let file = write_config("[server]\nport = 7000\n");

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.engine.capabilities["speech"].url, "http://localhost:5001");
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_invalid_engine_config() {
        let file = write_config("[pipeline]\ninterval_ms = 0\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("interval_ms"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().with_overrides(Some("127.0.0.1".into()), Some(8080));
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");

        let config = Config::default().with_overrides(None, None);
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
    }
}
