// ABOUTME: Configuration loading and validation for the sovereign-hub server.
// ABOUTME: Reads SOVEREIGN_* environment variables and refuses non-loopback binds unless allowed.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SOVEREIGN_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("bind address {0} is not loopback; set SOVEREIGN_ALLOW_REMOTE=true to listen on it")]
    RemoteNotAllowed(SocketAddr),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub home: PathBuf,
    pub log_file: PathBuf,
    pub bind: SocketAddr,
    pub allow_remote: bool,
}

impl HubConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - SOVEREIGN_HOME: data directory (default: ~/.sovereign)
    /// - SOVEREIGN_LOG_FILE: event log path (default: $SOVEREIGN_HOME/session_log.jsonl)
    /// - SOVEREIGN_BIND: socket address to bind (default: 127.0.0.1:8080)
    /// - SOVEREIGN_ALLOW_REMOTE: allow non-loopback binds (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = std::env::var("SOVEREIGN_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("/tmp"))
                    .join(".sovereign")
            });

        let log_file = std::env::var("SOVEREIGN_LOG_FILE")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("session_log.jsonl"));

        let bind_str =
            std::env::var("SOVEREIGN_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let allow_remote = std::env::var("SOVEREIGN_ALLOW_REMOTE")
            .map(|v| v == "true" || v == "1" || v == "yes")
            .unwrap_or(false);

        let config = Self {
            home,
            log_file,
            bind,
            allow_remote,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that must hold after any override is applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.allow_remote && !self.bind.ip().is_loopback() {
            return Err(ConfigError::RemoteNotAllowed(self.bind));
        }
        Ok(())
    }
}
