use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::buffer::DEFAULT_INITIAL_SIZE;
use crate::http::parser::BodyFraming;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub parser: ParserConfig,
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long close waits for in-flight connections before returning.
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 42069,
            shutdown_grace_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Starting size of the read buffer window.
    pub initial_buffer_size: usize,
    /// Largest the read buffer may grow to; `None` leaves it unbounded.
    pub max_buffer_size: Option<usize>,
    pub body_framing: BodyFraming,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            initial_buffer_size: DEFAULT_INITIAL_SIZE,
            max_buffer_size: Some(64 * 1024),
            body_framing: BodyFraming::Lenient,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Origin the `/httpbin/` demo route streams from.
    pub upstream: String,
    pub connect_timeout_ms: u64,
    /// Longest wait for any single read from the upstream.
    pub read_timeout_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            upstream: "http://httpbin.org".to_string(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Loads the file named by `CONFIG` if set, then applies a `PORT`
    /// override from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(port) = std::env::var("PORT") {
            cfg.server.port = port
                .parse()
                .with_context(|| format!("invalid PORT value {port:?}"))?;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}
