//! Server configuration from the environment.

use continuity_core::{ConfigError, EngineConfig};
use std::path::PathBuf;
use thiserror::Error;

pub const BIND_VAR: &str = "CONTINUITY_BIND";
pub const PORT_VAR: &str = "CONTINUITY_PORT";
pub const SNAPSHOT_VAR: &str = "CONTINUITY_SNAPSHOT";

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("CONTINUITY_PORT must be a valid port number, got {0:?}")]
    InvalidPort(String),

    #[error(transparent)]
    Engine(#[from] ConfigError),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Where the store is loaded from at start and saved to on shutdown.
    pub snapshot: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup(BIND_VAR).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup(PORT_VAR) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ServerConfigError::InvalidPort(raw))?,
            None => 8300,
        };
        let snapshot = lookup(SNAPSHOT_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        let engine = EngineConfig::from_lookup(&lookup)?;
        Ok(Self {
            bind,
            port,
            snapshot,
            engine,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
